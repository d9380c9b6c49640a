// ============================================================================
// vidcoder-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: Process management for the transcoder
//
// ffmpeg-sidecar does the heavy lifting of spawning ffmpeg and decoding its
// stderr. This module narrows that surface down to what supervision needs:
// a stream of `ProcessEvent`s, graceful and forceful termination, and the
// exit code.
//
// KEY COMPONENTS:
// - ProcessEvent: progress ticks and raw diagnostic lines
// - FfmpegProcess: a running child, object-safe so it can be shared
// - FfmpegSpawner: creates processes from an assembled FfmpegCommand
// - SidecarSpawner / SidecarProcess: the real implementation

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;

use crate::error::{CoreResult, command_failed_error, command_start_error};
use crate::utils::parse_ffmpeg_time;

// --- Events ---

/// One event decoded from the transcoder's stderr.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A periodic `frame=... time=...` status record.
    Progress {
        frame: u64,
        /// Output time processed so far, in seconds.
        time_secs: f64,
        fps: f64,
        speed: f64,
    },
    /// A human-readable diagnostic line, verbatim.
    Diagnostic(String),
}

impl ProcessEvent {
    /// Maps a sidecar event onto the two kinds supervision cares about.
    fn from_sidecar(event: FfmpegEvent) -> Option<Self> {
        match event {
            FfmpegEvent::Progress(progress) => Some(ProcessEvent::Progress {
                frame: u64::from(progress.frame),
                time_secs: parse_ffmpeg_time(&progress.time).unwrap_or(0.0),
                fps: f64::from(progress.fps),
                speed: f64::from(progress.speed),
            }),
            FfmpegEvent::Log(_level, line) => Some(ProcessEvent::Diagnostic(line)),
            FfmpegEvent::Error(line) => Some(ProcessEvent::Diagnostic(line)),
            _ => None,
        }
    }
}

/// Boxed stream of events, drained on the thread that runs the process.
pub type EventStream = Box<dyn Iterator<Item = ProcessEvent> + Send>;

// --- FFmpeg Execution Abstraction ---

/// An active ffmpeg process.
pub trait FfmpegProcess: Send {
    /// Takes the event stream. Subsequent calls fail: stderr can only be read once.
    fn take_events(&mut self) -> CoreResult<EventStream>;

    /// Asks ffmpeg to stop cleanly, finalizing the output container.
    fn terminate(&mut self) -> CoreResult<()>;

    /// Kills the process outright.
    fn kill(&mut self) -> CoreResult<()>;

    /// True while the child has not exited.
    fn is_running(&mut self) -> bool;

    /// Waits for exit. `None` means the process was ended by a signal.
    fn wait(&mut self) -> CoreResult<Option<i32>>;
}

/// Something that can launch an [`FfmpegProcess`].
pub trait FfmpegSpawner: Send + Sync {
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Box<dyn FfmpegProcess>>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

/// Wrapper around [`FfmpegChild`].
pub struct SidecarProcess {
    child: FfmpegChild,
    events_taken: bool,
}

impl FfmpegProcess for SidecarProcess {
    fn take_events(&mut self) -> CoreResult<EventStream> {
        if self.events_taken {
            return Err(command_failed_error(
                "ffmpeg",
                None,
                "event stream already taken",
            ));
        }
        let iterator = self.child.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            command_failed_error("ffmpeg", None, e.to_string())
        })?;
        self.events_taken = true;
        Ok(Box::new(iterator.filter_map(ProcessEvent::from_sidecar)))
    }

    fn terminate(&mut self) -> CoreResult<()> {
        // Writes `q` to stdin, which is ffmpeg's own clean-shutdown request.
        self.child
            .quit()
            .map_err(|e| command_failed_error("ffmpeg", None, format!("quit request failed: {e}")))
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.child.kill().map_err(|e| command_start_error("ffmpeg (kill)", e))
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.as_inner_mut().try_wait(), Ok(None))
    }

    fn wait(&mut self) -> CoreResult<Option<i32>> {
        self.child
            .wait()
            .map(|status| status.code())
            .map_err(|e| command_start_error("ffmpeg (wait)", e))
    }
}

/// Spawns real ffmpeg processes through `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Box<dyn FfmpegProcess>> {
        let child = cmd
            .spawn()
            .map_err(|e| command_start_error("ffmpeg", e))?;
        Ok(Box::new(SidecarProcess {
            child,
            events_taken: false,
        }))
    }
}
