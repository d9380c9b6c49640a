// vidcoder-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for this crate's own tests and for dependents enabling "test-mocks".
#![cfg(any(test, feature = "test-mocks"))]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use ffmpeg_sidecar::command::FfmpegCommand;

use super::{EventStream, FfmpegProcess, FfmpegSpawner, FfprobeExecutor, ProcessEvent};
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::media::{MediaDescription, ProbeReport};

/// Exit code reported by a mock process that was told to stop.
pub const TERMINATED_EXIT_CODE: i32 = 255;

/// Observable side of a [`MockFfmpegProcess`], shared with the test.
#[derive(Debug, Default)]
pub struct MockProcessState {
    terminated: AtomicBool,
    killed: AtomicBool,
    terminate_calls: AtomicUsize,
}

impl MockProcessState {
    pub fn was_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    pub fn terminate_calls(&self) -> usize {
        self.terminate_calls.load(Ordering::SeqCst)
    }

    fn stopped(&self) -> bool {
        self.was_terminated() || self.was_killed()
    }
}

/// Scripted stand-in for a running ffmpeg.
///
/// Emits its events in order and stops early once terminated. With
/// `block_until_stopped` set it keeps "running" after the last event until
/// `terminate` or `kill` is called, which lets tests cancel from another thread.
pub struct MockFfmpegProcess {
    events: Vec<ProcessEvent>,
    exit_code: Option<i32>,
    block_until_stopped: bool,
    fail_terminate: bool,
    state: Arc<MockProcessState>,
}

impl MockFfmpegProcess {
    pub fn new(events: Vec<ProcessEvent>, exit_code: i32) -> Self {
        Self {
            events,
            exit_code: Some(exit_code),
            block_until_stopped: false,
            fail_terminate: false,
            state: Arc::default(),
        }
    }

    pub fn blocking(mut self) -> Self {
        self.block_until_stopped = true;
        self
    }

    /// Makes `terminate` fail so the caller has to fall back to `kill`.
    pub fn failing_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }

    pub fn state(&self) -> Arc<MockProcessState> {
        Arc::clone(&self.state)
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn take_events(&mut self) -> CoreResult<EventStream> {
        let state = Arc::clone(&self.state);
        let events = std::mem::take(&mut self.events);
        let scripted = {
            let state = Arc::clone(&state);
            events.into_iter().take_while(move |_| !state.stopped())
        };
        if !self.block_until_stopped {
            return Ok(Box::new(scripted));
        }
        let idle = std::iter::from_fn(move || {
            while !state.stopped() {
                thread::sleep(Duration::from_millis(5));
            }
            None
        });
        Ok(Box::new(scripted.chain(idle)))
    }

    fn terminate(&mut self) -> CoreResult<()> {
        self.state.terminate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_terminate {
            return Err(command_start_error(
                "ffmpeg (quit)",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed"),
            ));
        }
        self.state.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.state.killed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        !self.state.stopped()
    }

    fn wait(&mut self) -> CoreResult<Option<i32>> {
        if self.state.was_killed() {
            Ok(None)
        } else if self.state.was_terminated() {
            Ok(Some(TERMINATED_EXIT_CODE))
        } else {
            Ok(self.exit_code)
        }
    }
}

enum SpawnResult {
    Process(MockFfmpegProcess, bool),
    Error(String),
}

/// Mock implementation of [`FfmpegSpawner`] handing out scripted processes in order.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    queue: Arc<Mutex<VecDeque<SpawnResult>>>,
    received_calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    /// Queues a process. With `create_dummy_output` the last argument is
    /// created as an empty file at spawn time, like a real encode would.
    pub fn add_process(&self, process: MockFfmpegProcess, create_dummy_output: bool) {
        self.lock_queue()
            .push_back(SpawnResult::Process(process, create_dummy_output));
    }

    /// Queues a spawn failure.
    pub fn add_spawn_error(&self, message: &str) {
        self.lock_queue()
            .push_back(SpawnResult::Error(message.to_string()));
    }

    pub fn received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.received_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<SpawnResult>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Box<dyn FfmpegProcess>> {
        let args: Vec<String> = cmd
            .get_args()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        self.received_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(args.clone());

        match self.lock_queue().pop_front() {
            Some(SpawnResult::Process(process, create_dummy_output)) => {
                if create_dummy_output {
                    match args.last() {
                        Some(output) => {
                            if let Err(e) = std::fs::write(output, b"mock output") {
                                log::error!("MockFfmpegSpawner failed to create {}: {}", output, e);
                            }
                        }
                        None => log::warn!("MockFfmpegSpawner found no output path in args"),
                    }
                }
                Ok(Box::new(process))
            }
            Some(SpawnResult::Error(message)) => Err(command_start_error(
                "ffmpeg",
                std::io::Error::other(message),
            )),
            None => Err(command_failed_error(
                "ffmpeg",
                None,
                format!("MockFfmpegSpawner: no process queued for {:?}", args),
            )),
        }
    }
}

enum ProbeResult {
    Report(ProbeReport),
    Malformed(String),
}

/// Mock implementation of [`FfprobeExecutor`] keyed by path.
///
/// Paths without an expectation behave like missing files.
#[derive(Clone, Default)]
pub struct MockFfprobeExecutor {
    results: Arc<Mutex<HashMap<PathBuf, ProbeResult>>>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockFfprobeExecutor {
    pub fn new() -> Self {
        Default::default()
    }

    /// Probing `path` yields a description built from `report`.
    pub fn expect_report(&self, path: &Path, report: ProbeReport) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), ProbeResult::Report(report));
    }

    /// Convenience for `expect_report` with a JSON literal.
    pub fn expect_json(&self, path: &Path, report: serde_json::Value) {
        match serde_json::from_value(report) {
            Ok(report) => self.expect_report(path, report),
            Err(e) => self.expect_malformed(path, &e.to_string()),
        }
    }

    /// Probing `path` fails as if ffprobe printed garbage.
    pub fn expect_malformed(&self, path: &Path, message: &str) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), ProbeResult::Malformed(message.to_string()));
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FfprobeExecutor for MockFfprobeExecutor {
    fn probe(&self, path: &Path) -> CoreResult<MediaDescription> {
        log::info!("MockFfprobeExecutor::probe called for: {}", path.display());
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());

        match self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            Some(ProbeResult::Report(report)) => {
                Ok(MediaDescription::from_report(path, report.clone()))
            }
            Some(ProbeResult::Malformed(message)) => Err(CoreError::MalformedOutput {
                tool: "ffprobe".to_string(),
                message: message.clone(),
            }),
            None => Err(CoreError::NotFound(path.to_path_buf())),
        }
    }
}
