// ============================================================================
// vidcoder-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: env_logger backend for the `log` facade
//
// Terminal output from `terminal.rs` and the encoder's user-facing messages
// are plain `info!` records and are printed without decoration. Everything
// else carries a timestamp, a colored level and the emitting module, so
// ffmpeg diagnostics (target `ffmpeg_log`) are easy to tell apart.
//
// USAGE:
// - default: info
// - `-v` / `--verbose`: debug
// - RUST_LOG: overrides both, e.g. RUST_LOG=ffmpeg_log=debug

use std::io::Write;

use console::{StyledObject, style};
use log::{Level, LevelFilter};

/// Installs the global logger. Records go to stdout so the progress bar on
/// stderr is not interleaved with them.
pub fn init(verbose: bool) {
    let default_level = default_level(verbose);
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level.as_str()),
    )
    .target(env_logger::Target::Stdout)
    .format(|buf, record| {
        if record.level() == Level::Info {
            return writeln!(buf, "{}", record.args());
        }
        writeln!(
            buf,
            "{} {} [{}] {}",
            buf.timestamp(),
            level_label(record.level()),
            record.target(),
            record.args()
        )
    })
    .init();

    log::debug!("Logger initialized with level: {default_level}");
}

fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn level_label(level: Level) -> StyledObject<&'static str> {
    match level {
        Level::Error => style("ERROR").red().bold(),
        Level::Warn => style("WARN ").yellow(),
        Level::Info => style("INFO ").green(),
        Level::Debug => style("DEBUG").blue(),
        Level::Trace => style("TRACE").magenta(),
    }
}
