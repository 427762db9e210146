//! Bootstrap progress tracking.
//!
//! Maps raw proxy progress reports onto serializer/status decisions. The
//! tracker is pure; the orchestrator applies the returned [`BootstrapStep`].

pub const BOOTSTRAP_COMPLETE: u8 = 100;

/// What the orchestrator must do after a progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    /// Report carried no new information (0, or not above the current value).
    Ignored,
    /// 1..=99: keep the serializer locked, publish the new percentage.
    InProgress(u8),
    /// 100: unlock, cancel the retry timer, replay the queued action.
    Complete,
}

/// Monotonic bootstrap percentage for one connection attempt.
#[derive(Debug, Clone, Default)]
pub struct BootstrapTracker {
    progress: u8,
}

impl BootstrapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= BOOTSTRAP_COMPLETE
    }

    /// Called at the beginning of every `start()`.
    pub fn reset(&mut self) {
        self.progress = 0;
    }

    /// Feed a reported percentage. Values above 100 are clamped.
    pub fn advance(&mut self, reported: u8) -> BootstrapStep {
        let reported = reported.min(BOOTSTRAP_COMPLETE);
        if reported == 0 || reported <= self.progress {
            return BootstrapStep::Ignored;
        }
        self.progress = reported;
        if reported == BOOTSTRAP_COMPLETE {
            BootstrapStep::Complete
        } else {
            BootstrapStep::InProgress(reported)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_a_no_op() {
        let mut tracker = BootstrapTracker::new();
        assert_eq!(tracker.advance(0), BootstrapStep::Ignored);
        assert_eq!(tracker.progress(), 0);
    }

    #[test]
    fn intermediate_values_are_in_progress() {
        let mut tracker = BootstrapTracker::new();
        assert_eq!(tracker.advance(5), BootstrapStep::InProgress(5));
        assert_eq!(tracker.advance(75), BootstrapStep::InProgress(75));
        assert_eq!(tracker.progress(), 75);
    }

    #[test]
    fn progress_never_decreases_within_an_attempt() {
        let mut tracker = BootstrapTracker::new();
        tracker.advance(50);
        assert_eq!(tracker.advance(10), BootstrapStep::Ignored);
        assert_eq!(tracker.advance(50), BootstrapStep::Ignored);
        assert_eq!(tracker.progress(), 50);
    }

    #[test]
    fn hundred_completes_once() {
        let mut tracker = BootstrapTracker::new();
        assert_eq!(tracker.advance(100), BootstrapStep::Complete);
        assert!(tracker.is_complete());
        assert_eq!(tracker.advance(100), BootstrapStep::Ignored);
    }

    #[test]
    fn out_of_range_values_clamp_to_complete() {
        let mut tracker = BootstrapTracker::new();
        assert_eq!(tracker.advance(250), BootstrapStep::Complete);
        assert_eq!(tracker.progress(), 100);
    }

    #[test]
    fn reset_starts_a_new_attempt_from_zero() {
        let mut tracker = BootstrapTracker::new();
        tracker.advance(100);
        tracker.reset();
        assert_eq!(tracker.progress(), 0);
        assert_eq!(tracker.advance(20), BootstrapStep::InProgress(20));
    }
}
