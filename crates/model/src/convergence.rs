//! Learning-rate decay and early stopping

/// Relative loss improvement below which an epoch counts as stalled
pub const STALL_THRESHOLD: f64 = 1e-8;

/// Training stops once more than this many epochs have stalled
pub const MAX_STALLS: usize = 10;

/// What the training loop should do after an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochOutcome {
    /// Loss improved enough; keep the learning rate
    Improved,
    /// Loss stalled; halve the learning rate and continue
    Stalled,
    /// Loss stalled once too often; halve the learning rate and stop
    Exhausted,
}

impl EpochOutcome {
    pub fn halves_learning_rate(self) -> bool {
        !matches!(self, EpochOutcome::Improved)
    }
}

/// Tracks the previous epoch's loss and the stall count
///
/// Stalls are counted over the whole run; an improving epoch does not reset them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceMonitor {
    previous_loss: f64,
    stalls: usize,
}

impl Default for ConvergenceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvergenceMonitor {
    pub fn new() -> Self {
        Self {
            previous_loss: f64::MAX,
            stalls: 0,
        }
    }

    /// `(previous - loss) / previous`, or 0 when the previous loss is not positive
    pub fn improvement_ratio(&self, loss: f64) -> f64 {
        if self.previous_loss > 0.0 {
            (self.previous_loss - loss) / self.previous_loss
        } else {
            0.0
        }
    }

    /// Record an epoch's loss
    pub fn observe(&mut self, loss: f64) -> EpochOutcome {
        let stalled = self.improvement_ratio(loss) < STALL_THRESHOLD;
        if stalled {
            self.stalls += 1;
        }
        if self.stalls > MAX_STALLS {
            return EpochOutcome::Exhausted;
        }

        self.previous_loss = loss;
        if stalled {
            EpochOutcome::Stalled
        } else {
            EpochOutcome::Improved
        }
    }

    pub fn stalls(&self) -> usize {
        self.stalls
    }

    pub fn previous_loss(&self) -> f64 {
        self.previous_loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_epoch_never_stalls() {
        let mut monitor = ConvergenceMonitor::new();
        assert_eq!(monitor.observe(1e300), EpochOutcome::Improved);

        let mut monitor = ConvergenceMonitor::new();
        assert_eq!(monitor.observe(0.0), EpochOutcome::Improved);
    }

    #[test]
    fn test_ratio_zero_when_previous_not_positive() {
        let mut monitor = ConvergenceMonitor::new();
        monitor.observe(0.0);
        assert_eq!(monitor.improvement_ratio(0.0), 0.0);
        assert_eq!(monitor.observe(0.0), EpochOutcome::Stalled);
    }

    #[test]
    fn test_small_improvement_stalls() {
        let mut monitor = ConvergenceMonitor::new();
        monitor.observe(100.0);
        assert_eq!(monitor.observe(100.0 - 1e-7), EpochOutcome::Stalled);
        assert_eq!(monitor.observe(50.0), EpochOutcome::Improved);
        assert_eq!(monitor.stalls(), 1);
        assert_eq!(monitor.previous_loss(), 50.0);
    }

    #[test]
    fn test_worse_loss_stalls() {
        let mut monitor = ConvergenceMonitor::new();
        monitor.observe(1.0);
        assert_eq!(monitor.observe(2.0), EpochOutcome::Stalled);
    }

    #[test]
    fn test_exhausted_on_eleventh_stall() {
        let mut monitor = ConvergenceMonitor::new();
        monitor.observe(5.0);

        for _ in 0..MAX_STALLS {
            assert_eq!(monitor.observe(5.0), EpochOutcome::Stalled);
        }
        let last = monitor.observe(5.0);
        assert_eq!(last, EpochOutcome::Exhausted);
        assert!(last.halves_learning_rate());
        assert_eq!(monitor.stalls(), MAX_STALLS + 1);
    }

    #[test]
    fn test_stalls_are_not_reset_by_improvement() {
        let mut monitor = ConvergenceMonitor::new();
        let mut loss = 1000.0;
        monitor.observe(loss);

        for _ in 0..MAX_STALLS {
            assert_eq!(monitor.observe(loss), EpochOutcome::Stalled);
            loss /= 2.0;
            assert_eq!(monitor.observe(loss), EpochOutcome::Improved);
        }
        assert_eq!(monitor.observe(loss), EpochOutcome::Exhausted);
    }

    #[test]
    fn test_nan_loss_is_not_a_stall() {
        let mut monitor = ConvergenceMonitor::new();
        monitor.observe(1.0);
        assert_eq!(monitor.observe(f64::NAN), EpochOutcome::Improved);
    }
}
