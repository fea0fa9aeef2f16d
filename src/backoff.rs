//! Bounded backoff curves for retryable conditions.
//!
//! A curve maps the 1-based number of the attempt that just failed to the delay before the next
//! one. Attempt `0` (nothing attempted yet) always yields zero. Every curve is monotonically
//! non-decreasing in the attempt number and never exceeds its ceiling.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use transport_core::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(200))
//!     .with_ceiling(Duration::from_secs(1))
//!     .unwrap();
//! assert_eq!(backoff.delay(1), Duration::from_millis(200));
//! assert_eq!(backoff.delay(2), Duration::from_millis(400));
//! assert_eq!(backoff.delay(3), Duration::from_millis(800));
//! assert_eq!(backoff.delay(4), Duration::from_secs(1)); // capped
//! ```

use std::time::Duration;

/// Ceiling applied when none is configured (raised to `base` if `base` is larger).
pub const DEFAULT_CEILING: Duration = Duration::from_secs(30);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Errors returned by backoff configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackoffError {
    #[error("ceiling must be greater than zero")]
    CeilingMustBePositive,
    #[error("ceiling ({ceiling:?}) must be >= base ({base:?})")]
    CeilingBelowBase { base: Duration, ceiling: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Curve {
    Constant,
    Linear,
    Exponential,
}

/// A backoff curve with a base delay and an upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    curve: Curve,
    base: Duration,
    ceiling: Duration,
}

impl Backoff {
    /// Same delay after every failed attempt.
    pub fn constant(delay: Duration) -> Self {
        Self { curve: Curve::Constant, base: delay, ceiling: delay }
    }

    /// `base * attempt`.
    pub fn linear(base: Duration) -> Self {
        Self { curve: Curve::Linear, base, ceiling: DEFAULT_CEILING.max(base) }
    }

    /// `base * 2^(attempt - 1)`.
    pub fn exponential(base: Duration) -> Self {
        Self { curve: Curve::Exponential, base, ceiling: DEFAULT_CEILING.max(base) }
    }

    /// Replace the ceiling. Fails if `ceiling` is zero or below the base delay.
    pub fn with_ceiling(mut self, ceiling: Duration) -> Result<Self, BackoffError> {
        if ceiling.is_zero() {
            return Err(BackoffError::CeilingMustBePositive);
        }
        if ceiling < self.base {
            return Err(BackoffError::CeilingBelowBase { base: self.base, ceiling });
        }
        if self.curve != Curve::Constant {
            self.ceiling = ceiling;
        }
        Ok(self)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Delay to wait after `attempt` failed attempts.
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let raw = match self.curve {
            Curve::Constant => self.base,
            Curve::Linear => {
                let factor = attempt.min(u32::MAX as usize) as u32;
                self.base.checked_mul(factor).unwrap_or(self.ceiling)
            }
            Curve::Exponential => {
                // Exponent clamped; past 2^64 the curve plateaus far above any practical ceiling.
                let exponent = (attempt - 1).min(64) as u32;
                let nanos = self.base.as_nanos().saturating_mul(1u128 << exponent);
                if nanos >= self.ceiling.as_nanos() {
                    self.ceiling
                } else {
                    Duration::new((nanos / NANOS_PER_SEC) as u64, (nanos % NANOS_PER_SEC) as u32)
                }
            }
        };
        raw.min(self.ceiling)
    }
}
