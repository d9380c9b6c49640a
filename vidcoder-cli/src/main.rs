// vidcoder-cli/src/main.rs
//
// Entry point for the `vidcoder` binary: parses arguments, installs the
// logger, dispatches to the command and maps the result to an exit status
// (0 on success, 1 on any failure).

use clap::Parser;
use std::process::ExitCode;

use vidcoder_cli::{Cli, CliError, Commands, logging, run_encode, run_info, terminal};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Encode(args) => run_encode(args),
        Commands::Info(args) => run_info(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let title = match e {
                CliError::EncodingFailed(_) => "Encoding failed",
                _ => "Error",
            };
            terminal::print_error(title, &e.to_string(), e.suggestion());
            ExitCode::FAILURE
        }
    }
}
