// ============================================================================
// vidcoder-core/src/process/mod.rs
// ============================================================================
//
// PROCESS CONTEXT: One supervised invocation of ffmpeg
//
// A `ProcessContext` accumulates inputs, outputs and options, probes the
// first input as soon as it is added, and then runs ffmpeg to completion on
// the calling thread. While the process runs, decoded progress ticks and raw
// diagnostic lines are pushed to the subscribed handlers.
//
// KEY COMPONENTS:
// - ProcessContext: configuration, execution and event pumping
// - ProcessHandle: clonable, thread-safe handle to the running child
// - ExecutionOutcome: exit code, wall time and the tail of stderr
//
// CONCURRENCY:
// `execute` takes the event stream out of the child before publishing the
// child in the handle, so a concurrent `terminate` only ever contends for
// the handle's mutex, never with the pumping loop.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use ffmpeg_sidecar::command::FfmpegCommand;

use crate::config::ToolPaths;
use crate::error::{CoreError, CoreResult, validation_error};
use crate::external::{
    CommandFfprobeExecutor, FfmpegProcess, FfmpegSpawner, FfprobeExecutor, ProcessEvent,
    SidecarSpawner,
};
use crate::media::MediaDescription;

pub mod events;
pub mod options;

pub use events::{EventChannel, HandlerId, ProgressTick, Subscription};
pub use options::OptionMap;

/// Number of diagnostic lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 20;

// ============================================================================
// FILE SPECS AND OUTCOME
// ============================================================================

/// An input or output file together with the options that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub options: OptionMap,
}

/// Result of a finished `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    /// The last diagnostic lines, oldest first.
    pub stderr_tail: Vec<String>,
}

impl ExecutionOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ============================================================================
// PROCESS HANDLE
// ============================================================================

/// Shared slot holding the running child, if any.
#[derive(Clone, Default)]
pub struct ProcessHandle {
    slot: Arc<Mutex<Option<Box<dyn FfmpegProcess>>>>,
}

impl ProcessHandle {
    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn FfmpegProcess>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, process: Box<dyn FfmpegProcess>) {
        *self.lock() = Some(process);
    }

    fn take(&self) -> Option<Box<dyn FfmpegProcess>> {
        self.lock().take()
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_mut().is_some_and(|process| process.is_running())
    }

    /// Requests a graceful stop.
    ///
    /// # Errors
    ///
    /// [`CoreError::NoActiveProcess`] if nothing is running, or the error of
    /// the underlying termination request.
    pub fn terminate(&self) -> CoreResult<()> {
        let mut slot = self.lock();
        match slot.as_mut() {
            Some(process) => {
                if process.is_running() {
                    process.terminate()
                } else {
                    Err(CoreError::NoActiveProcess)
                }
            }
            None => Err(CoreError::NoActiveProcess),
        }
    }

    /// Kills the process outright.
    pub fn kill(&self) -> CoreResult<()> {
        match self.lock().as_mut() {
            Some(process) => process.kill(),
            None => Err(CoreError::NoActiveProcess),
        }
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("active", &self.lock().is_some())
            .finish()
    }
}

// ============================================================================
// PROCESS CONTEXT
// ============================================================================

pub struct ProcessContext {
    ffmpeg: PathBuf,
    spawner: Arc<dyn FfmpegSpawner>,
    prober: Arc<dyn FfprobeExecutor>,
    auto_probe: bool,
    global_options: OptionMap,
    inputs: Vec<FileSpec>,
    outputs: Vec<FileSpec>,
    media_info: Option<MediaDescription>,
    progress: EventChannel<ProgressTick>,
    diagnostics: EventChannel<String>,
    handle: ProcessHandle,
    abort_flag: Option<Arc<AtomicBool>>,
    start_time: Option<DateTime<Local>>,
}

impl ProcessContext {
    /// A context running the real binaries named in `tools`.
    pub fn new(tools: &ToolPaths) -> Self {
        Self::with_executors(
            &tools.ffmpeg,
            Arc::new(SidecarSpawner),
            Arc::new(CommandFfprobeExecutor::new(&tools.ffprobe)),
        )
    }

    pub fn with_executors(
        ffmpeg: impl Into<PathBuf>,
        spawner: Arc<dyn FfmpegSpawner>,
        prober: Arc<dyn FfprobeExecutor>,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            spawner,
            prober,
            auto_probe: true,
            global_options: OptionMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            media_info: None,
            progress: EventChannel::new(),
            diagnostics: EventChannel::new(),
            handle: ProcessHandle::default(),
            abort_flag: None,
            start_time: None,
        }
    }

    // ---- Configuration ----

    /// Disables the implicit probe of the first input.
    pub fn set_auto_probe(&mut self, enabled: bool) -> &mut Self {
        self.auto_probe = enabled;
        self
    }

    /// Once this flag is set, the process is stopped as soon as it is spawned.
    pub fn with_abort_flag(&mut self, flag: Arc<AtomicBool>) -> &mut Self {
        self.abort_flag = Some(flag);
        self
    }

    pub fn global_option(&mut self, key: &str, value: &str) -> &mut Self {
        self.global_options.set(key, value);
        self
    }

    /// Adds `-y`.
    pub fn overwrite_output(&mut self) -> &mut Self {
        self.global_options.set_flag("y");
        self
    }

    /// Appends an input. The first input is probed immediately unless
    /// auto-probing is disabled; a probe failure is returned as is.
    pub fn set_input(&mut self, path: impl Into<PathBuf>, options: OptionMap) -> CoreResult<&mut Self> {
        self.inputs.push(FileSpec {
            path: path.into(),
            options,
        });
        if self.inputs.len() == 1 && self.auto_probe {
            self.probe()?;
        }
        Ok(self)
    }

    pub fn set_output(&mut self, path: impl Into<PathBuf>, options: OptionMap) -> &mut Self {
        self.outputs.push(FileSpec {
            path: path.into(),
            options,
        });
        self
    }

    /// Probes the first input and caches the result.
    pub fn probe(&mut self) -> CoreResult<&MediaDescription> {
        let path = self.first_input_path()?.to_path_buf();
        log::debug!("Probing input {}", path.display());
        let info = self.prober.probe(&path)?;
        Ok(self.media_info.insert(info))
    }

    // ---- Subscriptions ----

    pub fn on_progress<F>(&mut self, handler: F) -> HandlerId
    where
        F: FnMut(&ProgressTick, &mut Subscription) + Send + 'static,
    {
        self.progress.subscribe(handler)
    }

    pub fn on_diagnostic<F>(&mut self, handler: F) -> HandlerId
    where
        F: FnMut(&String, &mut Subscription) + Send + 'static,
    {
        self.diagnostics.subscribe(handler)
    }

    pub fn unsubscribe_progress(&mut self, id: HandlerId) -> bool {
        self.progress.unsubscribe(id)
    }

    pub fn unsubscribe_diagnostic(&mut self, id: HandlerId) -> bool {
        self.diagnostics.unsubscribe(id)
    }

    // ---- Accessors ----

    pub fn first_input_path(&self) -> CoreResult<&Path> {
        self.inputs
            .first()
            .map(|spec| spec.path.as_path())
            .ok_or(CoreError::NoInputConfigured)
    }

    pub fn inputs(&self) -> &[FileSpec] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[FileSpec] {
        &self.outputs
    }

    pub fn media_info(&self) -> Option<&MediaDescription> {
        self.media_info.as_ref()
    }

    /// Wall-clock time of the last `execute` call.
    pub fn start_time(&self) -> Option<DateTime<Local>> {
        self.start_time
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// A handle usable from other threads while `execute` blocks.
    pub fn handle(&self) -> ProcessHandle {
        self.handle.clone()
    }

    pub fn terminate(&self) -> CoreResult<()> {
        self.handle.terminate()
    }

    /// The configured arguments, without the executable:
    /// `global… [in-opts -i in]… [out-opts out]…`.
    ///
    /// ffmpeg-sidecar prepends its own log-level flags when the command is
    /// built, so the spawned argv may be longer; see [`command_line`].
    ///
    /// [`command_line`]: ProcessContext::command_line
    pub fn arguments(&self) -> Vec<String> {
        let mut args = self.global_options.to_args();
        for input in &self.inputs {
            args.extend(input.options.to_args());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().into_owned());
        }
        for output in &self.outputs {
            args.extend(output.options.to_args());
            args.push(output.path.to_string_lossy().into_owned());
        }
        args
    }

    fn build_command(&self) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new_with_path(&self.ffmpeg);
        cmd.args(self.arguments());
        cmd
    }

    /// The command line exactly as it is spawned, for logs.
    pub fn command_line(&self) -> String {
        render_command_line(&self.ffmpeg, &self.build_command())
    }

    // ---- Execution ----

    /// Runs ffmpeg and blocks until it exits, pumping events to the handlers.
    pub fn execute(&mut self) -> CoreResult<ExecutionOutcome> {
        self.first_input_path()?;
        if self.outputs.is_empty() {
            return Err(validation_error("No output file has been configured"));
        }

        let cmd = self.build_command();
        log::info!("Running ffmpeg: {}", render_command_line(&self.ffmpeg, &cmd));

        self.start_time = Some(Local::now());
        let started = Instant::now();

        let mut process = self.spawner.spawn(cmd)?;
        let events = match process.take_events() {
            Ok(events) => events,
            Err(e) => {
                if let Err(kill_err) = process.kill() {
                    log::warn!("Failed to kill ffmpeg after setup error: {}", kill_err);
                }
                return Err(e);
            }
        };
        self.handle.publish(process);

        if self
            .abort_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
        {
            log::debug!("Abort requested before ffmpeg started; stopping it");
            if let Err(e) = self.handle.terminate() {
                log::warn!("Graceful stop failed ({}), killing ffmpeg", e);
                if let Err(kill_err) = self.handle.kill() {
                    log::error!("Unable to stop ffmpeg: {}", kill_err);
                }
            }
        }

        let mut stderr_tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        for event in events {
            match event {
                ProcessEvent::Progress {
                    frame,
                    time_secs,
                    fps,
                    speed,
                } => {
                    let tick = ProgressTick {
                        frame,
                        processed_secs: time_secs,
                        fps,
                        reported_speed: speed,
                        elapsed: started.elapsed(),
                    };
                    self.progress.emit(&tick);
                }
                ProcessEvent::Diagnostic(line) => {
                    log::debug!(target: "ffmpeg_log", "{}", line);
                    if stderr_tail.len() == STDERR_TAIL_LINES {
                        stderr_tail.pop_front();
                    }
                    stderr_tail.push_back(line.clone());
                    self.diagnostics.emit(&line);
                }
            }
        }

        let exit_code = match self.handle.take() {
            Some(mut process) => process.wait()?,
            None => None,
        };
        let elapsed = started.elapsed();
        log::debug!(
            "ffmpeg exited with {:?} after {:.1}s",
            exit_code,
            elapsed.as_secs_f64()
        );

        Ok(ExecutionOutcome {
            exit_code,
            elapsed,
            stderr_tail: stderr_tail.into(),
        })
    }
}

fn render_command_line(program: &Path, cmd: &FfmpegCommand) -> String {
    let mut line = program.display().to_string();
    for arg in cmd.get_args() {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.contains(' ') {
            line.push_str(&format!("\"{arg}\""));
        } else {
            line.push_str(&arg);
        }
    }
    line
}

impl std::fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessContext")
            .field("ffmpeg", &self.ffmpeg)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
