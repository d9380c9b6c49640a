// ============================================================================
// vidcoder-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types for the CLI
//
// Wraps vidcoder-core errors and adds the failures that only exist at the
// command-line level: a bad input argument and an encode that finished
// unsuccessfully.

use std::path::PathBuf;

use thiserror::Error;
use vidcoder_core::CoreError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Input file '{}' does not exist", .0.display())]
    MissingInput(PathBuf),

    /// The encoder reported an unsuccessful outcome.
    #[error("{0}")]
    EncodingFailed(String),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Hint printed under the error message, when there is an obvious one.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Core(CoreError::CommandStart(..)) => {
                Some("Install ffmpeg or point --ffmpeg/--ffprobe at the binaries")
            }
            CliError::Core(CoreError::Setting(_)) => {
                Some("Run `vidcoder encode --help` for the accepted values")
            }
            CliError::MissingInput(_) => Some("Check the path and try again"),
            _ => None,
        }
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_display_unchanged() {
        let err: CliError = CoreError::Setting("CRF must be between 0 and 51, got 60".into()).into();
        assert_eq!(err.to_string(), "Setting error: CRF must be between 0 and 51, got 60");
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_missing_input_message() {
        let err = CliError::MissingInput(PathBuf::from("nowhere.mkv"));
        assert_eq!(err.to_string(), "Input file 'nowhere.mkv' does not exist");
    }

    #[test]
    fn test_encoding_failed_has_no_suggestion() {
        let err = CliError::EncodingFailed("Encoding cancelled by user".into());
        assert!(err.suggestion().is_none());
    }
}
