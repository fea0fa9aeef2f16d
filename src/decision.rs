//! Decisions produced by the engine.
//!
//! [`Decision`] is the single value a decision call yields: a tagged variant carrying exactly
//! the details that are meaningful for it. [`DecisionDetails`] flattens a decision into the
//! four independent fields exposed by the accessor surface, where every field always has a
//! value and validity depends on the decision kind.

use std::fmt;
use std::time::Duration;

/// Why the engine asked for another attempt.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetryReason {
    Network = 1,
    Timeout = 2,
    RateLimited = 3,
    AuthExpired = 4,
}

impl RetryReason {
    /// Stable numeric code (never 0; 0 is reserved for "no reason").
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Why the engine gave up.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailReason {
    MaxAttempts = 1,
    AuthFailed = 2,
    HardBlocked = 3,
    Unknown = 255,
}

impl FailReason {
    /// Stable numeric code (never 0; 0 is reserved for "no reason").
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Discriminant of a [`Decision`], numbered as at the C boundary.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    Proceed = 0,
    Retry = 1,
    RefreshAndRetry = 2,
    Fail = 3,
}

/// The next action for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The attempt succeeded; hand the response to the application.
    Proceed,
    /// Wait `after`, then make the next attempt.
    Retry { reason: RetryReason, after: Duration },
    /// Refresh credentials out-of-band, then call the engine again with the refresh result.
    RefreshAndRetry { reason: RetryReason },
    /// Stop. `retryable` is set when only the attempt budget ran out.
    Fail { reason: FailReason, retryable: bool },
}

impl Decision {
    pub(crate) fn fail(reason: FailReason) -> Self {
        Decision::Fail { reason, retryable: false }
    }

    pub(crate) fn budget_exhausted() -> Self {
        Decision::Fail { reason: FailReason::MaxAttempts, retryable: true }
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Proceed => DecisionKind::Proceed,
            Decision::Retry { .. } => DecisionKind::Retry,
            Decision::RefreshAndRetry { .. } => DecisionKind::RefreshAndRetry,
            Decision::Fail { .. } => DecisionKind::Fail,
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Decision::Retry { .. })
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Decision::Fail { .. })
    }

    /// Backoff before the next attempt; zero unless the decision is `Retry`.
    pub fn retry_after(&self) -> Duration {
        match self {
            Decision::Retry { after, .. } => *after,
            _ => Duration::ZERO,
        }
    }

    pub fn retry_reason(&self) -> Option<RetryReason> {
        match self {
            Decision::Retry { reason, .. } | Decision::RefreshAndRetry { reason } => Some(*reason),
            _ => None,
        }
    }

    pub fn fail_reason(&self) -> Option<FailReason> {
        match self {
            Decision::Fail { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// True only for a failure caused by budget exhaustion of a retryable condition.
    pub fn is_fail_retryable(&self) -> bool {
        matches!(self, Decision::Fail { retryable: true, .. })
    }

    /// Flatten into the accessor view.
    pub fn details(&self) -> DecisionDetails {
        DecisionDetails {
            retry_after: self.retry_after(),
            retry_reason: self.retry_reason(),
            fail_reason: self.fail_reason(),
            fail_retryable: self.is_fail_retryable(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Proceed => write!(f, "Proceed"),
            Decision::Retry { reason, after } => {
                write!(f, "Retry(reason={:?}, after={:?})", reason, after)
            }
            Decision::RefreshAndRetry { reason } => {
                write!(f, "RefreshAndRetry(reason={:?})", reason)
            }
            Decision::Fail { reason, retryable } => {
                write!(f, "Fail(reason={:?}, retryable={})", reason, retryable)
            }
        }
    }
}

/// Flattened details of the most recent decision.
///
/// Every field is overwritten together; the default value is what a caller observes before
/// any decision has been made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionDetails {
    pub retry_after: Duration,
    pub retry_reason: Option<RetryReason>,
    pub fail_reason: Option<FailReason>,
    pub fail_retryable: bool,
}

impl DecisionDetails {
    /// Backoff in whole milliseconds, saturating at `u32::MAX`.
    pub fn retry_after_ms(&self) -> u32 {
        u32::try_from(self.retry_after.as_millis()).unwrap_or(u32::MAX)
    }
}

impl From<&Decision> for DecisionDetails {
    fn from(decision: &Decision) -> Self {
        decision.details()
    }
}
