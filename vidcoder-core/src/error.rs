// ============================================================================
// vidcoder-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error types for the vidcoder-core library
//
// Prober and process-context failures are raised as typed errors to their
// direct caller. The encoder converts every one of them into a single
// finished notification, so nothing here ever reaches the top-level caller
// of `Encoder::start`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the core library.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before or during configuration (missing file, no video).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A file handed to the prober does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An external tool exited with a non-zero status.
    #[error("{tool} failed with exit code {}: {stderr}", describe_exit_code(.exit_code))]
    ProcessFailure {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The inspection tool produced output that is not a usable report.
    #[error("Malformed output from {tool}: {message}")]
    MalformedOutput { tool: String, message: String },

    /// An external tool could not be started at all.
    #[error("Failed to start {0}: {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("No process is currently running")]
    NoActiveProcess,

    #[error("No input file has been configured")]
    NoInputConfigured,

    /// Rejected change to encoding parameters.
    #[error("Setting error: {0}")]
    Setting(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

/// Result type for vidcoder-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Builds a [`CoreError::ProcessFailure`] from a tool name, exit code and stderr text.
pub fn command_failed_error(
    tool: impl Into<String>,
    exit_code: Option<i32>,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::ProcessFailure {
        tool: tool.into(),
        exit_code,
        stderr: stderr.into(),
    }
}

/// Builds a [`CoreError::CommandStart`] for a tool that could not be spawned.
pub fn command_start_error(tool: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(tool.into(), err)
}

/// Builds a [`CoreError::Validation`].
pub fn validation_error(message: impl Into<String>) -> CoreError {
    CoreError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failure_message_includes_exit_code() {
        let err = command_failed_error("ffprobe", Some(1), "Invalid data found");
        assert_eq!(
            err.to_string(),
            "ffprobe failed with exit code 1: Invalid data found"
        );

        let err = command_failed_error("ffmpeg", None, "killed");
        assert!(err.to_string().contains("unknown"));
    }

    #[test]
    fn test_not_found_displays_path() {
        let err = CoreError::NotFound(PathBuf::from("/tmp/missing.mkv"));
        assert_eq!(err.to_string(), "File not found: /tmp/missing.mkv");
    }
}
