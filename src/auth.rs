//! Auth-refresh protocol.
//!
//! An authentication failure (401/403) takes two decision calls to resolve. The first call,
//! with `RefreshResult::NotAttempted`, consults the host's [`AuthDecision`]: the engine either
//! asks for a refresh (`RefreshAndRetry`) or fails. The host performs the refresh out-of-band
//! and calls again with the same outcome and the refresh result, which yields `Retry` (if the
//! attempt budget allows) or `Fail`.
//!
//! Each logical request is allowed a single refresh. The [`AuthPhase`] carried by the
//! engine enforces that: a host that was asked to refresh and reports `NotAttempted` again
//! fails with `AuthFailed`, and so does an authentication failure after the refresh cycle
//! has completed.
//!
//! The engine never refreshes credentials itself.

use crate::decision::{Decision, FailReason, RetryReason};
use crate::model::RequestContext;
use std::fmt;
use std::time::Duration;

/// Host policy on whether a credential refresh should be attempted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthDecision {
    RefreshAndRetry,
    Fail,
}

/// Status of the refresh cycle driven by an earlier `RefreshAndRetry` decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefreshResult {
    #[default]
    NotAttempted,
    Failed,
    Succeeded,
}

impl fmt::Display for RefreshResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefreshResult::NotAttempted => "not_attempted",
            RefreshResult::Failed => "failed",
            RefreshResult::Succeeded => "succeeded",
        };
        f.write_str(s)
    }
}

/// Where a logical request stands in its refresh cycle.
///
/// A request gets one refresh. Once the engine has asked for it, the host must report a
/// result; once a result is in, a further authentication failure is final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthPhase {
    #[default]
    Idle,
    /// `RefreshAndRetry` was returned and the host has not reported back yet.
    RefreshRequested,
    /// The refresh cycle is over, whatever its result.
    RefreshSpent,
}

/// Resolve an authentication failure and advance `phase`.
///
/// Idempotency is not consulted here; only a successful refresh is checked against the
/// attempt budget, since that is the only path that leads to another attempt.
pub fn resolve(
    ctx: &RequestContext,
    phase: &mut AuthPhase,
    auth_decision: AuthDecision,
    refresh_result: RefreshResult,
) -> Decision {
    let from = *phase;
    let (decision, next) = match (from, refresh_result, auth_decision) {
        (AuthPhase::RefreshSpent, _, _) => (auth_failed(), AuthPhase::RefreshSpent),
        (AuthPhase::RefreshRequested, RefreshResult::NotAttempted, _) => {
            (auth_failed(), AuthPhase::RefreshSpent)
        }
        (AuthPhase::Idle, RefreshResult::NotAttempted, AuthDecision::RefreshAndRetry) => (
            Decision::RefreshAndRetry { reason: RetryReason::AuthExpired },
            AuthPhase::RefreshRequested,
        ),
        (AuthPhase::Idle, RefreshResult::NotAttempted, AuthDecision::Fail) => {
            (auth_failed(), AuthPhase::Idle)
        }
        (_, RefreshResult::Succeeded, _) if ctx.is_last_attempt() => {
            (Decision::budget_exhausted(), AuthPhase::RefreshSpent)
        }
        (_, RefreshResult::Succeeded, _) => (
            Decision::Retry { reason: RetryReason::AuthExpired, after: Duration::ZERO },
            AuthPhase::RefreshSpent,
        ),
        (_, RefreshResult::Failed, _) => (auth_failed(), AuthPhase::RefreshSpent),
    };
    *phase = next;
    tracing::debug!(
        attempt = ctx.attempt(),
        max_attempts = ctx.max_attempts(),
        ?auth_decision,
        refresh = %refresh_result,
        ?from,
        to = ?next,
        decision = %decision,
        "auth refresh step"
    );
    decision
}

fn auth_failed() -> Decision {
    Decision::fail(FailReason::AuthFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HttpMethod;

    fn ctx(attempt: u8) -> RequestContext {
        RequestContext::new(HttpMethod::Get, attempt, 3).unwrap()
    }

    fn step(
        phase: &mut AuthPhase,
        attempt: u8,
        auth: AuthDecision,
        refresh: RefreshResult,
    ) -> Decision {
        resolve(&ctx(attempt), phase, auth, refresh)
    }

    const AUTH_FAILED: Decision =
        Decision::Fail { reason: FailReason::AuthFailed, retryable: false };

    #[test]
    fn first_call_asks_for_refresh() {
        let mut phase = AuthPhase::Idle;
        let d = step(&mut phase, 1, AuthDecision::RefreshAndRetry, RefreshResult::NotAttempted);
        assert_eq!(d, Decision::RefreshAndRetry { reason: RetryReason::AuthExpired });
        assert_eq!(phase, AuthPhase::RefreshRequested);
    }

    #[test]
    fn host_declining_fails_without_retryability() {
        let mut phase = AuthPhase::Idle;
        let d = step(&mut phase, 1, AuthDecision::Fail, RefreshResult::NotAttempted);
        assert_eq!(d, AUTH_FAILED);
        assert_eq!(phase, AuthPhase::Idle);
    }

    #[test]
    fn refresh_request_ignores_budget() {
        let mut phase = AuthPhase::Idle;
        let d = step(&mut phase, 3, AuthDecision::RefreshAndRetry, RefreshResult::NotAttempted);
        assert_eq!(d, Decision::RefreshAndRetry { reason: RetryReason::AuthExpired });
    }

    #[test]
    fn successful_refresh_retries_immediately() {
        let mut phase = AuthPhase::RefreshRequested;
        let d = step(&mut phase, 2, AuthDecision::RefreshAndRetry, RefreshResult::Succeeded);
        assert_eq!(d, Decision::Retry { reason: RetryReason::AuthExpired, after: Duration::ZERO });
        assert_eq!(phase, AuthPhase::RefreshSpent);
    }

    #[test]
    fn successful_refresh_on_last_attempt_exhausts_budget() {
        let mut phase = AuthPhase::RefreshRequested;
        let d = step(&mut phase, 3, AuthDecision::RefreshAndRetry, RefreshResult::Succeeded);
        assert_eq!(d, Decision::Fail { reason: FailReason::MaxAttempts, retryable: true });
    }

    #[test]
    fn failed_refresh_is_terminal() {
        for auth in [AuthDecision::RefreshAndRetry, AuthDecision::Fail] {
            let mut phase = AuthPhase::RefreshRequested;
            assert_eq!(step(&mut phase, 1, auth, RefreshResult::Failed), AUTH_FAILED);
            assert_eq!(phase, AuthPhase::RefreshSpent);
        }
    }

    #[test]
    fn unanswered_refresh_request_fails() {
        let mut phase = AuthPhase::RefreshRequested;
        let d = step(&mut phase, 1, AuthDecision::RefreshAndRetry, RefreshResult::NotAttempted);
        assert_eq!(d, AUTH_FAILED);
        assert_eq!(phase, AuthPhase::RefreshSpent);
    }

    #[test]
    fn spent_refresh_cycle_fails_every_auth_step() {
        for auth in [AuthDecision::RefreshAndRetry, AuthDecision::Fail] {
            for refresh in
                [RefreshResult::NotAttempted, RefreshResult::Failed, RefreshResult::Succeeded]
            {
                let mut phase = AuthPhase::RefreshSpent;
                assert_eq!(step(&mut phase, 2, auth, refresh), AUTH_FAILED);
                assert_eq!(phase, AuthPhase::RefreshSpent);
            }
        }
    }

    #[test]
    fn result_reported_without_request_is_accepted_once() {
        let mut phase = AuthPhase::Idle;
        let d = step(&mut phase, 1, AuthDecision::Fail, RefreshResult::Succeeded);
        assert!(d.is_retry());
        let d = step(&mut phase, 2, AuthDecision::Fail, RefreshResult::Succeeded);
        assert_eq!(d, AUTH_FAILED);
    }
}
