// vidcoder-cli/src/lib.rs
//
// Library portion of the Vidcoder CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod progress;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, EncodeArgs, InfoArgs};
pub use commands::encode::run_encode;
pub use commands::info::run_info;
pub use error::{CliError, CliResult};
