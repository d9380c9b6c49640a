//! Percent-complete and ETA estimation from progress ticks.

use std::time::Duration;

/// What the caller's progress callback receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// 0 to 100.
    pub percent: f64,
    /// Remaining time in whole seconds, never negative.
    pub eta_secs: u64,
    /// Processed media seconds per wall-clock second.
    pub speed: f64,
    pub frame: u64,
}

/// Totals of the input that ticks are measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressEstimator {
    total_duration: f64,
    total_frames: u64,
}

impl ProgressEstimator {
    pub fn new(total_duration: f64, total_frames: u64) -> Self {
        Self {
            total_duration: total_duration.max(0.0),
            total_frames,
        }
    }

    /// Computes the update for one tick.
    ///
    /// `speed` is processed/elapsed and 0 while nothing has elapsed. The ETA
    /// is what is left of the input at that speed, 0 when the speed is
    /// unknown. Percent comes from frames and is 0 without a known total.
    pub fn estimate(&self, frame: u64, processed_secs: f64, elapsed: Duration) -> ProgressUpdate {
        let elapsed_secs = elapsed.as_secs_f64();
        let speed = if elapsed_secs > 0.0 {
            processed_secs / elapsed_secs
        } else {
            0.0
        };

        let eta_secs = if speed > 0.0 {
            ((self.total_duration - processed_secs) / speed).max(0.0) as u64
        } else {
            0
        };

        let percent = if self.total_frames > 0 {
            (100.0 * frame as f64 / self.total_frames as f64).min(100.0)
        } else {
            0.0
        };

        ProgressUpdate {
            percent,
            eta_secs,
            speed,
            frame,
        }
    }

    /// The update sent once the process exited successfully.
    pub fn finished(&self) -> ProgressUpdate {
        ProgressUpdate {
            percent: 100.0,
            eta_secs: 0,
            speed: 0.0,
            frame: self.total_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_speed_eta() {
        let estimator = ProgressEstimator::new(50.0, 0);
        let update = estimator.estimate(0, 5.0, Duration::from_secs(10));
        assert!((update.speed - 0.5).abs() < 1e-9);
        assert_eq!(update.eta_secs, 90);
        assert_eq!(update.percent, 0.0);
    }

    #[test]
    fn test_percent_is_capped() {
        let estimator = ProgressEstimator::new(10.0, 200);
        assert_eq!(estimator.estimate(50, 2.0, Duration::from_secs(1)).percent, 25.0);
        assert_eq!(estimator.estimate(250, 12.0, Duration::from_secs(1)).percent, 100.0);
    }

    #[test]
    fn test_eta_never_negative() {
        let estimator = ProgressEstimator::new(10.0, 0);
        let update = estimator.estimate(0, 12.0, Duration::from_secs(4));
        assert_eq!(update.eta_secs, 0);
    }

    #[test]
    fn test_zero_elapsed_means_unknown_speed() {
        let estimator = ProgressEstimator::new(10.0, 100);
        let update = estimator.estimate(10, 1.0, Duration::ZERO);
        assert_eq!(update.speed, 0.0);
        assert_eq!(update.eta_secs, 0);
        assert_eq!(update.percent, 10.0);
    }
}
