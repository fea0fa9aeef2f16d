//! Stateful decision engine for one logical request.
//!
//! `DecisionEngine` evaluates each attempt against its (possibly shared) policy and keeps the
//! most recent decision so the details can be read back through independent accessors. Only
//! the latest decision is retained; every call overwrites it in full. The engine also tracks
//! the request's refresh cycle, so a second refresh is never requested for the same request.
//!
//! The engine is `Send` but mutated by `decide`; share it across threads only behind external
//! synchronization. The intended use is one engine per logical request, driven by that
//! request's sequential retry loop.
//!
//! Example
//! ```rust
//! use transport_core::{
//!     AuthDecision, Decision, DecisionEngine, HttpMethod, Outcome, RefreshResult,
//!     RequestContext, RetryReason,
//! };
//!
//! let mut engine = DecisionEngine::new();
//! let ctx = RequestContext::new(HttpMethod::Get, 1, 3).unwrap();
//! let decision = engine.decide(
//!     &ctx,
//!     &Outcome::RateLimited { retry_after_ms: 3000 },
//!     AuthDecision::Fail,
//!     RefreshResult::NotAttempted,
//! );
//! assert!(decision.is_retry());
//! assert_eq!(engine.retry_after_ms(), 3000);
//! assert_eq!(engine.retry_reason(), Some(RetryReason::RateLimited));
//! ```

use crate::auth::{AuthDecision, AuthPhase, RefreshResult};
use crate::decision::{Decision, DecisionDetails, FailReason, RetryReason};
use crate::model::{Outcome, RequestContext};
use crate::{EnginePolicy, SharedPolicy};

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    policy: SharedPolicy,
    auth_phase: AuthPhase,
    last: Option<Decision>,
    details: DecisionDetails,
}

impl DecisionEngine {
    /// Engine with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine reading its policy from `policy` on every decision.
    pub fn with_policy(policy: impl Into<SharedPolicy>) -> Self {
        Self {
            policy: policy.into(),
            auth_phase: AuthPhase::Idle,
            last: None,
            details: DecisionDetails::default(),
        }
    }

    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    /// Decide the next action and record it as the latest decision.
    pub fn decide(
        &mut self,
        ctx: &RequestContext,
        outcome: &Outcome,
        auth_decision: AuthDecision,
        refresh_result: RefreshResult,
    ) -> Decision {
        let policy = self.policy.get();
        let decision =
            policy.evaluate_in(&mut self.auth_phase, ctx, outcome, auth_decision, refresh_result);
        tracing::debug!(
            method = %ctx.method(),
            attempt = ctx.attempt(),
            max_attempts = ctx.max_attempts(),
            outcome = %outcome,
            decision = %decision,
            "retry decision"
        );
        self.record(decision);
        decision
    }

    /// Record a decision made outside [`EnginePolicy::evaluate`], such as a rejection of
    /// malformed boundary input.
    pub fn record(&mut self, decision: Decision) {
        self.details = decision.details();
        self.last = Some(decision);
    }

    /// Forget the latest decision and the refresh cycle, e.g. before reusing the engine for
    /// a new logical request.
    pub fn reset(&mut self) {
        self.auth_phase = AuthPhase::Idle;
        self.last = None;
        self.details = DecisionDetails::default();
    }

    /// Refresh-cycle state of the current logical request.
    pub fn auth_phase(&self) -> AuthPhase {
        self.auth_phase
    }

    pub fn last_decision(&self) -> Option<&Decision> {
        self.last.as_ref()
    }

    pub fn details(&self) -> &DecisionDetails {
        &self.details
    }

    /// Backoff in milliseconds; meaningful when the last decision was `Retry`.
    pub fn retry_after_ms(&self) -> u32 {
        self.details.retry_after_ms()
    }

    /// Meaningful when the last decision was `Retry` or `RefreshAndRetry`.
    pub fn retry_reason(&self) -> Option<RetryReason> {
        self.details.retry_reason
    }

    /// Meaningful when the last decision was `Fail`.
    pub fn fail_reason(&self) -> Option<FailReason> {
        self.details.fail_reason
    }

    pub fn fail_retryable(&self) -> bool {
        self.details.fail_retryable
    }
}

impl From<EnginePolicy> for DecisionEngine {
    fn from(policy: EnginePolicy) -> Self {
        Self::with_policy(policy)
    }
}
