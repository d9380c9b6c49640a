// ============================================================================
// vidcoder-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: indicatif bar driven by the encoder callbacks
//
// The bar is cloned into the encoder's callbacks, which may run on another
// thread; `ProgressBar` is internally synchronized so no extra locking is
// needed here. Position is kept in tenths of a percent.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use vidcoder_core::{EncodingState, ProgressUpdate, format_duration};

const BAR_TEMPLATE: &str = "{prefix:>10.cyan.bold} [{bar:40.cyan/blue}] {msg}";
const BAR_LENGTH: u64 = 1000;

/// Progress display for a single encode.
#[derive(Clone)]
pub struct EncodeProgress {
    bar: ProgressBar,
}

impl EncodeProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(BAR_LENGTH))
    }

    /// A bar that never draws, for tests and non-interactive runs.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>.");
        bar.set_length(BAR_LENGTH);
        bar.set_style(style);
        bar.set_prefix(EncodingState::Idle.display_text());
        Self { bar }
    }

    pub fn set_state(&self, state: EncodingState) {
        self.bar.set_prefix(state.display_text());
        if state == EncodingState::Encoding {
            self.bar.enable_steady_tick(Duration::from_millis(250));
        } else if state.is_terminal() {
            self.bar.disable_steady_tick();
        }
    }

    pub fn update(&self, update: &ProgressUpdate) {
        self.bar.set_position(position(update.percent));
        self.bar.set_message(progress_message(update));
    }

    /// Runs `f` with the bar cleared so log output is not drawn over it.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for EncodeProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn position(percent: f64) -> u64 {
    (percent.clamp(0.0, 100.0) * 10.0).round() as u64
}

/// `42.5% | ETA 00:01:10 | 1.25x`
pub fn progress_message(update: &ProgressUpdate) -> String {
    format!(
        "{:.1}% | ETA {} | {:.2}x",
        update.percent,
        format_duration(update.eta_secs as f64),
        update.speed
    )
}
