// ============================================================================
// vidcoder-core/src/encoder/mod.rs
// ============================================================================
//
// ENCODER: State machine driving one input -> output conversion
//
// `Encoder::start` validates the input, configures a `ProcessContext`, runs
// ffmpeg on the calling thread and classifies the result. `Encoder::cancel`
// may be called from any other thread while `start` blocks.
//
// STATES:
//   Idle -> Preparing -> Encoding -> Completed | Cancelled | Error
//   Preparing | Encoding -> Cancelling -> Cancelled
//
// `Encoding` is entered lazily, when ffmpeg prints its `options:` line, and
// only when a progress callback is registered.
// Every attempt ends with exactly one finished notification.
//
// SHARED STATE:
// The state, the cancellation flag and the running process handle are the
// only things touched from both sides. The terminal state is chosen while
// holding the state lock, and `cancel` only acts while holding the same lock
// in `Preparing` or `Encoding`, so a cancellation is either seen by the
// classification or is a no-op.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::ToolPaths;
use crate::error::{CoreError, CoreResult, validation_error};
use crate::external::{CommandFfprobeExecutor, FfmpegSpawner, FfprobeExecutor, SidecarSpawner};
use crate::media::MediaDescription;
use crate::process::{OptionMap, ProcessContext, ProcessHandle};

pub mod effective_options;
pub mod progress;
pub mod settings;


pub use effective_options::{EffectiveOptions, parse_effective_options};
pub use progress::{ProgressEstimator, ProgressUpdate};
pub use settings::EncodingSettings;

const MSG_SUCCESS: &str = "Encoding completed successfully";
const MSG_CANCELLED: &str = "Encoding cancelled by user";

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EncodingState {
    #[default]
    Idle,
    Preparing,
    Encoding,
    Cancelling,
    Cancelled,
    Completed,
    Error,
}

impl EncodingState {
    pub fn display_text(&self) -> &'static str {
        match self {
            EncodingState::Idle => "Idle",
            EncodingState::Preparing => "Preparing",
            EncodingState::Encoding => "Encoding",
            EncodingState::Cancelling => "Cancelling",
            EncodingState::Cancelled => "Cancelled",
            EncodingState::Completed => "Completed",
            EncodingState::Error => "Error",
        }
    }

    /// True for the states that end an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EncodingState::Cancelled | EncodingState::Completed | EncodingState::Error
        )
    }

    /// True while an attempt is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            EncodingState::Preparing | EncodingState::Encoding | EncodingState::Cancelling
        )
    }
}

impl fmt::Display for EncodingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

// ============================================================================
// OUTCOME AND CALLBACKS
// ============================================================================

/// What the finished callback receives.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingOutcome {
    pub success: bool,
    pub message: String,
    /// Description of the written output, present only on success.
    pub output: Option<MediaDescription>,
}

impl EncodingOutcome {
    fn succeeded(output: MediaDescription) -> Self {
        Self {
            success: true,
            message: MSG_SUCCESS.to_string(),
            output: Some(output),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            output: None,
        }
    }
}

type LogFn = dyn Fn(&str) + Send + Sync;
type StateFn = dyn Fn(EncodingState) + Send + Sync;
type StartedFn = dyn Fn(&EffectiveOptions, Option<&MediaDescription>) + Send + Sync;
type ProgressFn = dyn Fn(&ProgressUpdate) + Send + Sync;
type FinishedFn = dyn Fn(&EncodingOutcome) + Send + Sync;

/// Observer hooks. Each one runs on the thread that triggered it: progress
/// and started run on the thread blocked in `start`.
#[derive(Clone, Default)]
struct EncoderCallbacks {
    on_log: Option<Arc<LogFn>>,
    on_state_changed: Option<Arc<StateFn>>,
    on_started: Option<Arc<StartedFn>>,
    on_progress: Option<Arc<ProgressFn>>,
    on_finished: Option<Arc<FinishedFn>>,
}

/// The step of an attempt an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validate,
    ProbeInput,
    Execute,
}

/// An error that ended an attempt before ffmpeg reported an exit status.
#[derive(Debug)]
struct AttemptError {
    stage: Stage,
    source: CoreError,
}

impl AttemptError {
    fn validation(message: String) -> Self {
        Self {
            stage: Stage::Validate,
            source: validation_error(message),
        }
    }

    fn stage(stage: Stage) -> impl FnOnce(CoreError) -> Self {
        move |source| Self { stage, source }
    }

    /// Message for the failed outcome, naming the step that failed.
    fn message(&self) -> String {
        match (self.stage, &self.source) {
            (_, CoreError::Validation(_)) | (Stage::Validate, _) => self.source.to_string(),
            (Stage::ProbeInput, e) => format!("Probing input failed: {e}"),
            (Stage::Execute, e) => format!("FFmpeg execution failed: {e}"),
        }
    }
}

// ============================================================================
// SHARED STATE
// ============================================================================

#[derive(Default)]
struct Shared {
    state: Mutex<EncodingState>,
    cancelled: Arc<AtomicBool>,
    in_flight: AtomicBool,
    process: Mutex<Option<ProcessHandle>>,
    encoding_params: Mutex<OptionMap>,
    effective_options: Mutex<Option<EffectiveOptions>>,
    input_media_info: Mutex<Option<MediaDescription>>,
    last_error: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Performs a state change and notifies the observer if the state moved.
fn transition(shared: &Shared, callbacks: &EncoderCallbacks, new_state: EncodingState) {
    let changed = {
        let mut state = lock(&shared.state);
        let changed = *state != new_state;
        *state = new_state;
        changed
    };
    if changed {
        log::debug!("Encoder state -> {}", new_state);
        if let Some(cb) = &callbacks.on_state_changed {
            cb(new_state);
        }
    }
}

// ============================================================================
// ENCODER
// ============================================================================

pub struct Encoder {
    input: PathBuf,
    output: PathBuf,
    input_params: OptionMap,
    ffmpeg: PathBuf,
    spawner: Arc<dyn FfmpegSpawner>,
    prober: Arc<dyn FfprobeExecutor>,
    callbacks: EncoderCallbacks,
    shared: Arc<Shared>,
}

impl Encoder {
    /// An encoder for `input` -> `output` using the real binaries in `tools`.
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        encoding_params: OptionMap,
        tools: &ToolPaths,
    ) -> Self {
        let shared = Shared {
            encoding_params: Mutex::new(encoding_params),
            ..Shared::default()
        };
        Self {
            input: input.into(),
            output: output.into(),
            input_params: OptionMap::new(),
            ffmpeg: tools.ffmpeg.clone(),
            spawner: Arc::new(SidecarSpawner),
            prober: Arc::new(CommandFfprobeExecutor::new(&tools.ffprobe)),
            callbacks: EncoderCallbacks::default(),
            shared: Arc::new(shared),
        }
    }

    /// Options placed before `-i`.
    pub fn with_input_params(mut self, params: OptionMap) -> Self {
        self.input_params = params;
        self
    }

    /// Replaces the process spawner and the prober.
    pub fn with_executors(
        mut self,
        spawner: Arc<dyn FfmpegSpawner>,
        prober: Arc<dyn FfprobeExecutor>,
    ) -> Self {
        self.spawner = spawner;
        self.prober = prober;
        self
    }

    // ---- Callback registration ----

    pub fn on_log(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.callbacks.on_log = Some(Arc::new(f));
        self
    }

    pub fn on_state_changed(mut self, f: impl Fn(EncodingState) + Send + Sync + 'static) -> Self {
        self.callbacks.on_state_changed = Some(Arc::new(f));
        self
    }

    pub fn on_started(
        mut self,
        f: impl Fn(&EffectiveOptions, Option<&MediaDescription>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_started = Some(Arc::new(f));
        self
    }

    /// Registering a progress callback enables tick decoding and the
    /// `options:` line tracking that moves the encoder into `Encoding`.
    pub fn on_progress(mut self, f: impl Fn(&ProgressUpdate) + Send + Sync + 'static) -> Self {
        self.callbacks.on_progress = Some(Arc::new(f));
        self
    }

    pub fn on_finished(mut self, f: impl Fn(&EncodingOutcome) + Send + Sync + 'static) -> Self {
        self.callbacks.on_finished = Some(Arc::new(f));
        self
    }

    // ---- Accessors ----

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn state(&self) -> EncodingState {
        *lock(&self.shared.state)
    }

    pub fn is_encoding(&self) -> bool {
        self.state() == EncodingState::Encoding
    }

    pub fn is_cancelling(&self) -> bool {
        self.state() == EncodingState::Cancelling
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == EncodingState::Cancelled
    }

    /// The probe of the input made while preparing the last attempt.
    pub fn input_media_info(&self) -> Option<MediaDescription> {
        lock(&self.shared.input_media_info).clone()
    }

    /// Options ffmpeg reported as applied during the last attempt.
    pub fn effective_options(&self) -> Option<EffectiveOptions> {
        lock(&self.shared.effective_options).clone()
    }

    /// Message of the last failed attempt.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared.last_error).clone()
    }

    pub fn encoding_params(&self) -> OptionMap {
        lock(&self.shared.encoding_params).clone()
    }

    // ---- Parameter updates ----

    /// Merges `params` into the output options.
    ///
    /// # Errors
    ///
    /// [`CoreError::Setting`] while encoding or cancelling; the current
    /// options are left untouched.
    pub fn update_encoding_params(&self, params: &OptionMap) -> CoreResult<()> {
        let state = lock(&self.shared.state);
        if matches!(*state, EncodingState::Encoding | EncodingState::Cancelling) {
            return Err(CoreError::Setting(
                "Encoding parameters cannot be changed while an encode is running".to_string(),
            ));
        }
        lock(&self.shared.encoding_params).merge(params);
        Ok(())
    }

    // ---- Logging ----

    fn log(&self, message: &str) {
        match &self.callbacks.on_log {
            Some(cb) => cb(message),
            None => log::info!("{}", message),
        }
    }

    // ---- Lifecycle ----

    /// Runs one encoding attempt to its end and returns its outcome.
    ///
    /// Never fails: every error becomes a failed outcome, which is also
    /// delivered to the finished callback exactly once. A call made while
    /// another attempt is in flight is rejected without notifications.
    pub fn start(&self) -> EncodingOutcome {
        if self
            .shared
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("Encoder::start called while an encode is already running");
            return EncodingOutcome::failed("An encode is already running");
        }

        self.shared.cancelled.store(false, Ordering::SeqCst);
        *lock(&self.shared.effective_options) = None;
        *lock(&self.shared.last_error) = None;
        transition(&self.shared, &self.callbacks, EncodingState::Preparing);

        let outcome = match self.run_attempt() {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.message();
                log::error!("Encoding attempt failed: {}", message);
                match self.settle(EncodingState::Error) {
                    EncodingState::Cancelled => EncodingOutcome::failed(MSG_CANCELLED),
                    _ => EncodingOutcome::failed(message),
                }
            }
        };

        *lock(&self.shared.process) = None;
        if !outcome.success {
            *lock(&self.shared.last_error) = Some(outcome.message.clone());
        }
        self.shared.in_flight.store(false, Ordering::SeqCst);

        if let Some(cb) = &self.callbacks.on_finished {
            cb(&outcome);
        }
        outcome
    }

    fn run_attempt(&self) -> Result<EncodingOutcome, AttemptError> {
        if !self.input.exists() {
            return Err(AttemptError::validation(format!(
                "Input file does not exist: {}",
                self.input.display()
            )));
        }

        let mut ctx = ProcessContext::with_executors(
            &self.ffmpeg,
            Arc::clone(&self.spawner),
            Arc::clone(&self.prober),
        );
        ctx.with_abort_flag(Arc::clone(&self.shared.cancelled))
            .overwrite_output();
        ctx.set_input(&self.input, self.input_params.clone())
            .map_err(AttemptError::stage(Stage::ProbeInput))?;
        ctx.set_output(&self.output, self.encoding_params());

        let media = ctx.media_info().cloned();
        *lock(&self.shared.input_media_info) = media.clone();
        let media = match media {
            Some(media) if media.has_video_stream() => media,
            _ => {
                return Err(AttemptError::validation(format!(
                    "{} has no video stream",
                    self.input.display()
                )));
            }
        };

        self.subscribe_handlers(&mut ctx, &media);

        self.log("Starting encode with command:");
        self.log(&ctx.command_line());

        *lock(&self.shared.process) = Some(ctx.handle());
        if self.shared.cancelled.load(Ordering::SeqCst) {
            log::debug!("Cancelled before ffmpeg was started");
            self.settle(EncodingState::Cancelled);
            return Ok(EncodingOutcome::failed(MSG_CANCELLED));
        }

        let execution = ctx.execute().map_err(AttemptError::stage(Stage::Execute))?;

        if !execution.success() {
            if self.settle(EncodingState::Error) == EncodingState::Cancelled {
                self.remove_partial_output();
                return Ok(EncodingOutcome::failed(MSG_CANCELLED));
            }
            let code = execution
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let mut message = format!("Encoding failed (exit code {code})");
            if let Some(last) = execution.stderr_tail.last() {
                message.push_str(&format!(": {last}"));
            }
            return Ok(EncodingOutcome::failed(message));
        }

        let verified = self.prober.probe(&self.output);
        let preferred = if verified.is_ok() {
            EncodingState::Completed
        } else {
            EncodingState::Error
        };

        match (self.settle(preferred), verified) {
            (EncodingState::Cancelled, _) => {
                self.remove_partial_output();
                Ok(EncodingOutcome::failed(MSG_CANCELLED))
            }
            (_, Ok(output)) => {
                if let Some(cb) = &self.callbacks.on_progress {
                    let estimator = ProgressEstimator::new(media.duration(), media.total_frames());
                    cb(&estimator.finished());
                }
                self.log(MSG_SUCCESS);
                Ok(EncodingOutcome::succeeded(output))
            }
            (_, Err(e)) => Ok(EncodingOutcome::failed(format!(
                "Encoding finished but the output could not be verified: {e}"
            ))),
        }
    }

    /// Wires the diagnostic and progress handlers into `ctx`. Both are only
    /// installed when the caller registered a progress callback.
    fn subscribe_handlers(&self, ctx: &mut ProcessContext, media: &MediaDescription) {
        let Some(on_progress) = self.callbacks.on_progress.clone() else {
            log::debug!("No progress callback registered; ffmpeg output is not tracked");
            return;
        };

        {
            let shared = Arc::clone(&self.shared);
            let callbacks = self.callbacks.clone();
            let media = media.clone();
            ctx.on_diagnostic(move |line, subscription| {
                let Some(options) = parse_effective_options(line) else {
                    return;
                };
                let entered = {
                    let mut state = lock(&shared.state);
                    let entered = *state == EncodingState::Preparing;
                    if entered {
                        *state = EncodingState::Encoding;
                    }
                    entered
                };
                *lock(&shared.effective_options) = Some(options.clone());
                if entered {
                    log::debug!("Encoder state -> {}", EncodingState::Encoding);
                    if let Some(cb) = &callbacks.on_state_changed {
                        cb(EncodingState::Encoding);
                    }
                }
                if let Some(cb) = &callbacks.on_started {
                    cb(&options, Some(&media));
                }
                subscription.detach();
            });
        }

        let cancelled = Arc::clone(&self.shared.cancelled);
        let estimator = ProgressEstimator::new(media.duration(), media.total_frames());
        ctx.on_progress(move |tick, _| {
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            on_progress(&estimator.estimate(tick.frame, tick.processed_secs, tick.elapsed));
        });
    }

    /// Moves to a terminal state: `Cancelled` if a cancellation was
    /// requested, `preferred` otherwise. Returns the state chosen.
    fn settle(&self, preferred: EncodingState) -> EncodingState {
        let (chosen, changed) = {
            let mut state = lock(&self.shared.state);
            let chosen = if self.shared.cancelled.load(Ordering::SeqCst) {
                EncodingState::Cancelled
            } else {
                preferred
            };
            let changed = *state != chosen;
            *state = chosen;
            (chosen, changed)
        };
        if changed {
            log::debug!("Encoder state -> {}", chosen);
            if let Some(cb) = &self.callbacks.on_state_changed {
                cb(chosen);
            }
        }
        chosen
    }

    /// Requests cancellation of the running attempt.
    ///
    /// Does nothing unless the encoder is preparing or encoding. Never fails:
    /// termination problems are logged.
    pub fn cancel(&self) {
        {
            let mut state = lock(&self.shared.state);
            if !matches!(*state, EncodingState::Preparing | EncodingState::Encoding) {
                return;
            }
            self.shared.cancelled.store(true, Ordering::SeqCst);
            *state = EncodingState::Cancelling;
        }
        log::debug!("Encoder state -> {}", EncodingState::Cancelling);
        if let Some(cb) = &self.callbacks.on_state_changed {
            cb(EncodingState::Cancelling);
        }

        let handle = lock(&self.shared.process).clone();
        let Some(handle) = handle.filter(ProcessHandle::is_running) else {
            // Not spawned yet: the abort flag stops it as soon as it is.
            return;
        };

        self.log("Cancelling the running encode...");
        match handle.terminate() {
            Ok(()) => self.log("Stop request sent to ffmpeg"),
            Err(e) => {
                self.log(&format!("Error while stopping ffmpeg: {e}"));
                match handle.kill() {
                    Ok(()) => self.log("ffmpeg process killed"),
                    Err(kill_err) => {
                        log::error!("Unable to stop ffmpeg: {}", kill_err);
                        self.log(&format!("Unable to stop ffmpeg: {kill_err}"));
                    }
                }
            }
        }
        self.remove_partial_output();
    }

    fn remove_partial_output(&self) {
        if !self.output.exists() {
            return;
        }
        match fs::remove_file(&self.output) {
            Ok(()) => self.log("Partial output file removed"),
            Err(e) => log::warn!(
                "Failed to remove partial output {}: {}",
                self.output.display(),
                e
            ),
        }
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
