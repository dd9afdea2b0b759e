//! Exponential backoff.
//!
//! The delay before retry `n` (0-indexed) is `base × 2^n`, clamped to `max`,
//! then jittered. The base is derived from the attempt number alone, so
//! jitter never feeds back into later delays.

use super::jitter::Jitter;
use std::time::Duration;

/// Exponential backoff with a cap
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry
    pub base: Duration,
    /// Upper bound for any delay
    pub max: Duration,
    pub jitter: Jitter,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            max: Duration::from_secs(10),
            jitter: Jitter::None,
        }
    }
}

impl Backoff {
    /// Delay to wait before retry number `attempt` (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.base.as_secs_f64() * 2f64.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(base_ms: u64, max_ms: u64) -> Backoff {
        Backoff {
            base: Duration::from_millis(base_ms),
            max: Duration::from_millis(max_ms),
            jitter: Jitter::None,
        }
    }

    #[test]
    fn test_doubles_per_attempt() {
        let b = backoff(200, 60_000);
        assert_eq!(b.delay(0), Duration::from_millis(200));
        assert_eq!(b.delay(1), Duration::from_millis(400));
        assert_eq!(b.delay(2), Duration::from_millis(800));
        assert_eq!(b.delay(3), Duration::from_millis(1600));
    }

    #[test]
    fn test_clamped_to_max() {
        let b = backoff(200, 1000);
        assert_eq!(b.delay(3), Duration::from_millis(1000));
        assert_eq!(b.delay(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let b = backoff(100, 5000);
        assert_eq!(b.delay(u32::MAX), Duration::from_millis(5000));
    }

    #[test]
    fn test_base_above_max() {
        let b = backoff(10_000, 5000);
        assert_eq!(b.delay(0), Duration::from_millis(5000));
    }

    #[test]
    fn test_equal_jitter_stays_non_decreasing_below_cap() {
        let b = Backoff {
            jitter: Jitter::Equal,
            ..backoff(100, 60_000)
        };
        for _ in 0..50 {
            let mut prev = Duration::ZERO;
            for attempt in 0..8 {
                let d = b.delay(attempt);
                assert!(d >= prev, "attempt {}: {:?} < {:?}", attempt, d, prev);
                prev = d;
            }
        }
    }
}
