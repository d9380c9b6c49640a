// ============================================================================
// vidcoder-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Boundaries to the ffmpeg and ffprobe binaries
//
// Everything that spawns a child process lives behind one of two traits so
// the process context and the encoder can be driven by test doubles.
//
// KEY COMPONENTS:
// - FfmpegSpawner / FfmpegProcess: launching and supervising the transcoder
// - FfprobeExecutor: one-shot inspection producing a MediaDescription
// - check_dependency: `-version` smoke test used by the CLI before encoding

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{CoreResult, command_failed_error, command_start_error};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Spawning and supervising ffmpeg through ffmpeg-sidecar
pub mod ffmpeg_executor;

/// Running ffprobe and decoding its JSON report
pub mod ffprobe_executor;

/// Test doubles for both tools
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{
    EventStream, FfmpegProcess, FfmpegSpawner, ProcessEvent, SidecarProcess, SidecarSpawner,
};
pub use ffprobe_executor::{CommandFfprobeExecutor, FfprobeExecutor, probe};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Verifies that `executable` can be started by running it with `-version`.
pub fn check_dependency(executable: &Path) -> CoreResult<()> {
    let name = executable.display().to_string();
    let status = Command::new(executable)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => {
            log::debug!("Found dependency: {}", name);
            Ok(())
        }
        Ok(status) => Err(command_failed_error(
            name,
            status.code(),
            "version check failed",
        )),
        Err(e) => {
            if e.kind() == io::ErrorKind::NotFound {
                log::warn!("Dependency '{}' not found.", name);
            }
            Err(command_start_error(name, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_is_start_error() {
        let err = check_dependency(Path::new("/nonexistent/bin/ffmpeg-xyz")).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::CommandStart(_, _)));
    }
}
