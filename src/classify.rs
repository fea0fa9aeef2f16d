//! Outcome classification.
//!
//! Routes an [`Outcome`] onto one of the policy tracks, in priority order:
//! authentication (401/403), hard block (Blocked/Captcha), then everything else, which is
//! either retryable, terminal, or a success.

use crate::decision::RetryReason;
use crate::model::Outcome;
use std::time::Duration;

/// How raw `HttpStatus` outcomes that have a dedicated semantic kind are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusMapping {
    /// The transport already turned 429 responses into `Outcome::RateLimited`; a raw
    /// `HttpStatus(429)` is treated like any other 4xx.
    #[default]
    PreClassified,
    /// The engine reclassifies `HttpStatus(429)` as a rate limit with no server hint.
    Inspect,
}

/// The policy track an outcome is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyTrack {
    /// 401/403: decided entirely by the auth-refresh protocol.
    Auth,
    /// Blocked/Captcha: fails unconditionally.
    HardBlock,
    /// Subject to the idempotency gate and the attempt budget. `hint` is the server's
    /// requested wait, when it sent one.
    Retryable { reason: RetryReason, hint: Option<Duration> },
    /// Non-retryable failure (unhandled 4xx, codes outside the known classes).
    Terminal,
    /// 2xx/3xx.
    Success,
}

/// Classify `outcome` under the given status mapping.
pub fn classify(outcome: &Outcome, mapping: StatusMapping) -> PolicyTrack {
    match *outcome {
        Outcome::HttpStatus(401 | 403) => PolicyTrack::Auth,
        Outcome::Blocked | Outcome::Captcha => PolicyTrack::HardBlock,
        Outcome::NetworkError => {
            PolicyTrack::Retryable { reason: RetryReason::Network, hint: None }
        }
        Outcome::TimeoutError => {
            PolicyTrack::Retryable { reason: RetryReason::Timeout, hint: None }
        }
        Outcome::RateLimited { retry_after_ms } => PolicyTrack::Retryable {
            reason: RetryReason::RateLimited,
            hint: Some(Duration::from_millis(u64::from(retry_after_ms))),
        },
        Outcome::HttpStatus(status) => classify_status(status, mapping),
    }
}

fn classify_status(status: u16, mapping: StatusMapping) -> PolicyTrack {
    match status {
        200..=399 => PolicyTrack::Success,
        429 if mapping == StatusMapping::Inspect => {
            PolicyTrack::Retryable { reason: RetryReason::RateLimited, hint: None }
        }
        500..=599 => PolicyTrack::Retryable { reason: RetryReason::Network, hint: None },
        _ => PolicyTrack::Terminal,
    }
}
