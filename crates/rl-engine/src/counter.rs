//! Round counter shared by every policy.

use bandit_core::{BanditError, BanditResult};

/// Number of observed rounds. Starts at zero; any explicit value must be
/// strictly positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationCounter {
    iteration: u64,
}

impl IterationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.iteration
    }

    /// Replace the stored count with `t`. Not an increment.
    pub fn set(&mut self, t: u64) -> BanditResult<()> {
        if t == 0 {
            return Err(BanditError::InvalidArgument(format!(
                "iteration number must be positive, got {t}"
            )));
        }
        self.iteration = t;
        Ok(())
    }

    /// Read-then-set by one; returns the new count.
    pub fn advance(&mut self) -> BanditResult<u64> {
        let next = self.iteration.checked_add(1).ok_or_else(|| {
            BanditError::InvalidArgument("iteration counter overflow".to_string())
        })?;
        self.set(next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(IterationCounter::new().get(), 0);
    }

    #[test]
    fn test_set_replaces_value() {
        let mut counter = IterationCounter::new();
        counter.set(2).unwrap();
        assert_eq!(counter.get(), 2);
        counter.set(7).unwrap();
        assert_eq!(counter.get(), 7);
    }

    #[test]
    fn test_set_rejects_zero() {
        let mut counter = IterationCounter::new();
        counter.set(5).unwrap();
        assert!(matches!(
            counter.set(0),
            Err(BanditError::InvalidArgument(_))
        ));
        // Failed set leaves the value untouched.
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_advance_increments_by_one() {
        let mut counter = IterationCounter::new();
        assert_eq!(counter.advance().unwrap(), 1);
        assert_eq!(counter.advance().unwrap(), 2);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_advance_overflow() {
        let mut counter = IterationCounter::new();
        counter.set(u64::MAX).unwrap();
        assert!(counter.advance().is_err());
        assert_eq!(counter.get(), u64::MAX);
    }
}
