//! ffprobe integration: turns a media file into a [`MediaDescription`].
//!
//! The tool is run once per call with
//! `-v error -print_format json -show_streams -show_format <absolute path>`
//! and its stdout is decoded as a [`ProbeReport`]. Nothing is cached.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::media::{MediaDescription, ProbeReport};

/// Something that can describe a media file.
pub trait FfprobeExecutor: Send + Sync {
    fn probe(&self, path: &Path) -> CoreResult<MediaDescription>;
}

/// Runs a real ffprobe binary.
#[derive(Debug, Clone)]
pub struct CommandFfprobeExecutor {
    executable: PathBuf,
}

impl CommandFfprobeExecutor {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Default for CommandFfprobeExecutor {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeExecutor for CommandFfprobeExecutor {
    fn probe(&self, path: &Path) -> CoreResult<MediaDescription> {
        probe(&self.executable, path)
    }
}

/// Probes `path` with the ffprobe binary at `executable`.
///
/// # Errors
///
/// - [`CoreError::NotFound`] if `path` does not exist (checked before spawning)
/// - [`CoreError::CommandStart`] if ffprobe cannot be launched
/// - [`CoreError::ProcessFailure`] if ffprobe exits non-zero, carrying its stderr
/// - [`CoreError::MalformedOutput`] if stdout is not a JSON probe report
pub fn probe(executable: &Path, path: &Path) -> CoreResult<MediaDescription> {
    if !path.exists() {
        return Err(CoreError::NotFound(path.to_path_buf()));
    }
    let absolute = std::path::absolute(path)?;

    let mut cmd = Command::new(executable);
    cmd.args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
        .arg(&absolute);
    log::debug!("Running ffprobe: {:?}", cmd);

    let output = cmd
        .output()
        .map_err(|e| command_start_error(executable.display().to_string(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        log::error!(
            "ffprobe failed on {} ({}): {}",
            path.display(),
            output.status,
            stderr
        );
        return Err(command_failed_error("ffprobe", output.status.code(), stderr));
    }

    let report: ProbeReport =
        serde_json::from_slice(&output.stdout).map_err(|e| CoreError::MalformedOutput {
            tool: "ffprobe".to_string(),
            message: e.to_string(),
        })?;

    Ok(MediaDescription::from_report(path, report))
}
