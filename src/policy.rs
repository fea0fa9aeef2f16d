//! Engine policy: tunable constants and the decision function.
//!
//! [`EnginePolicy::evaluate`] is the whole decision procedure as a function of its inputs:
//!
//! 1. Classify the outcome ([`classify`]).
//! 2. Authentication failures go to the auth-refresh protocol ([`auth::resolve`]), which
//!    allows one refresh per request.
//! 3. Hard blocks fail with `HardBlocked`, never retryable.
//! 4. Retryable conditions pass the idempotency gate, then the attempt budget, and finally
//!    get a backoff: the server's hint for rate limits (capped at `max_retry_after`), or the
//!    reason's backoff curve with jitter applied otherwise.
//!
//! Semantics:
//! - The idempotency gate is checked before the budget: a request that must not be replayed
//!   fails with `Unknown`/non-retryable even on its last attempt.
//! - Budget exhaustion of a retryable condition fails with `MaxAttempts` and
//!   `retryable = true`.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use transport_core::{
//!     AuthDecision, Backoff, Decision, EnginePolicy, HttpMethod, Outcome, RefreshResult,
//!     RequestContext, RetryReason,
//! };
//!
//! let policy = EnginePolicy::builder()
//!     .network_backoff(Backoff::exponential(Duration::from_millis(100)))
//!     .build()
//!     .unwrap();
//! let ctx = RequestContext::new(HttpMethod::Get, 2, 3).unwrap();
//! let decision = policy.evaluate(
//!     &ctx,
//!     &Outcome::NetworkError,
//!     AuthDecision::Fail,
//!     RefreshResult::NotAttempted,
//! );
//! assert_eq!(
//!     decision,
//!     Decision::Retry { reason: RetryReason::Network, after: Duration::from_millis(200) }
//! );
//! ```

use crate::auth::{self, AuthDecision, AuthPhase, RefreshResult};
use crate::backoff::BackoffError;
use crate::classify::{classify, PolicyTrack, StatusMapping};
use crate::decision::{Decision, FailReason, RetryReason};
use crate::model::{Outcome, RequestContext};
use crate::{Backoff, Jitter};
use std::time::Duration;

const DEFAULT_NETWORK_BASE_MS: u64 = 200;
const DEFAULT_TIMEOUT_BASE_MS: u64 = 500;
const DEFAULT_RATE_LIMIT_BASE_MS: u64 = 1_500;
const DEFAULT_BACKOFF_CEILING_SECS: u64 = 30;
const DEFAULT_RATE_LIMIT_CEILING_SECS: u64 = 120;
/// Default cap on server-supplied `Retry-After` hints.
pub const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_millis(120_000);

/// Tunable policy consulted by every decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePolicy {
    network_backoff: Backoff,
    timeout_backoff: Backoff,
    rate_limit_backoff: Backoff,
    jitter: Jitter,
    max_retry_after: Duration,
    status_mapping: StatusMapping,
}

impl EnginePolicy {
    /// Construct a new builder with defaults.
    pub fn builder() -> EnginePolicyBuilder {
        EnginePolicyBuilder::new()
    }

    pub fn network_backoff(&self) -> &Backoff {
        &self.network_backoff
    }

    pub fn timeout_backoff(&self) -> &Backoff {
        &self.timeout_backoff
    }

    pub fn rate_limit_backoff(&self) -> &Backoff {
        &self.rate_limit_backoff
    }

    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    pub fn max_retry_after(&self) -> Duration {
        self.max_retry_after
    }

    pub fn status_mapping(&self) -> StatusMapping {
        self.status_mapping
    }

    /// Decide the next action for one attempt, with no refresh cycle in progress.
    ///
    /// Authentication failures are judged as a first step; use [`EnginePolicy::evaluate_in`]
    /// (or a [`DecisionEngine`](crate::DecisionEngine)) to carry the refresh cycle across
    /// calls.
    pub fn evaluate(
        &self,
        ctx: &RequestContext,
        outcome: &Outcome,
        auth_decision: AuthDecision,
        refresh_result: RefreshResult,
    ) -> Decision {
        self.evaluate_in(&mut AuthPhase::default(), ctx, outcome, auth_decision, refresh_result)
    }

    /// Decide the next action for one attempt of a request whose refresh cycle is `phase`.
    /// Only authentication failures read or advance `phase`.
    pub fn evaluate_in(
        &self,
        phase: &mut AuthPhase,
        ctx: &RequestContext,
        outcome: &Outcome,
        auth_decision: AuthDecision,
        refresh_result: RefreshResult,
    ) -> Decision {
        match classify(outcome, self.status_mapping) {
            PolicyTrack::Auth => auth::resolve(ctx, phase, auth_decision, refresh_result),
            PolicyTrack::HardBlock => Decision::fail(FailReason::HardBlocked),
            PolicyTrack::Success => Decision::Proceed,
            PolicyTrack::Terminal => Decision::fail(FailReason::Unknown),
            PolicyTrack::Retryable { reason, hint } => self.retry(ctx, reason, hint),
        }
    }

    fn retry(&self, ctx: &RequestContext, reason: RetryReason, hint: Option<Duration>) -> Decision {
        if !ctx.is_replay_safe() {
            return Decision::fail(FailReason::Unknown);
        }
        if ctx.is_last_attempt() {
            return Decision::budget_exhausted();
        }
        let after = match hint {
            Some(hint) => hint.min(self.max_retry_after),
            None => self.backoff_delay(reason, ctx.attempt()),
        };
        Decision::Retry { reason, after }
    }

    /// Jittered curve delay after `attempt` failed attempts for `reason`.
    pub fn backoff_delay(&self, reason: RetryReason, attempt: u8) -> Duration {
        let curve = match reason {
            RetryReason::Network => &self.network_backoff,
            RetryReason::Timeout => &self.timeout_backoff,
            RetryReason::RateLimited => &self.rate_limit_backoff,
            RetryReason::AuthExpired => return Duration::ZERO,
        };
        self.jitter.apply(curve.delay(usize::from(attempt)))
    }
}

impl Default for EnginePolicy {
    fn default() -> Self {
        EnginePolicyBuilder::new().into_policy()
    }
}

/// Errors produced while building an engine policy.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A zero cap would discard every server hint.
    #[error("max_retry_after must be > 0")]
    ZeroRetryAfterCap,
    #[error("invalid backoff: {0}")]
    Backoff(#[from] BackoffError),
    #[error(transparent)]
    Jitter(#[from] crate::jitter::UnknownJitter),
}

/// Builder for [`EnginePolicy`].
#[derive(Debug, Clone)]
pub struct EnginePolicyBuilder {
    network_backoff: Backoff,
    timeout_backoff: Backoff,
    rate_limit_backoff: Backoff,
    jitter: Jitter,
    max_retry_after: Duration,
    status_mapping: StatusMapping,
}

impl EnginePolicyBuilder {
    /// Create a builder with the default constants.
    pub fn new() -> Self {
        Self {
            network_backoff: default_curve(DEFAULT_NETWORK_BASE_MS, DEFAULT_BACKOFF_CEILING_SECS),
            timeout_backoff: default_curve(DEFAULT_TIMEOUT_BASE_MS, DEFAULT_BACKOFF_CEILING_SECS),
            rate_limit_backoff: default_curve(
                DEFAULT_RATE_LIMIT_BASE_MS,
                DEFAULT_RATE_LIMIT_CEILING_SECS,
            ),
            jitter: Jitter::None,
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
            status_mapping: StatusMapping::PreClassified,
        }
    }

    /// Backoff for network errors and 5xx responses.
    pub fn network_backoff(mut self, backoff: Backoff) -> Self {
        self.network_backoff = backoff;
        self
    }

    /// Backoff for timeouts.
    pub fn timeout_backoff(mut self, backoff: Backoff) -> Self {
        self.timeout_backoff = backoff;
        self
    }

    /// Backoff for rate limits that arrive without a server hint.
    pub fn rate_limit_backoff(mut self, backoff: Backoff) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    /// Set jitter strategy.
    ///
    /// Jittered delays never exceed the curve value for their attempt, but consecutive
    /// delays are no longer guaranteed to be non-decreasing. Keep [`Jitter::None`] when the
    /// caller relies on monotonic backoff.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Upper bound on honoured server hints. Must be > 0.
    pub fn max_retry_after(mut self, cap: Duration) -> Self {
        self.max_retry_after = cap;
        self
    }

    pub fn status_mapping(mut self, mapping: StatusMapping) -> Self {
        self.status_mapping = mapping;
        self
    }

    /// Build the policy, validating inputs.
    pub fn build(self) -> Result<EnginePolicy, BuildError> {
        if self.max_retry_after.is_zero() {
            return Err(BuildError::ZeroRetryAfterCap);
        }
        Ok(self.into_policy())
    }

    fn into_policy(self) -> EnginePolicy {
        EnginePolicy {
            network_backoff: self.network_backoff,
            timeout_backoff: self.timeout_backoff,
            rate_limit_backoff: self.rate_limit_backoff,
            jitter: self.jitter,
            max_retry_after: self.max_retry_after,
            status_mapping: self.status_mapping,
        }
    }
}

impl Default for EnginePolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_curve(base_ms: u64, ceiling_secs: u64) -> Backoff {
    let base = Duration::from_millis(base_ms);
    let ceiling = Duration::from_secs(ceiling_secs);
    // Defaults always satisfy 0 < base <= ceiling.
    Backoff::exponential(base).with_ceiling(ceiling).unwrap_or_else(|_| Backoff::exponential(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HttpMethod;

    fn get(attempt: u8, max: u8) -> RequestContext {
        RequestContext::new(HttpMethod::Get, attempt, max).unwrap()
    }

    fn eval(policy: &EnginePolicy, ctx: &RequestContext, outcome: Outcome) -> Decision {
        policy.evaluate(ctx, &outcome, AuthDecision::Fail, RefreshResult::NotAttempted)
    }

    #[test]
    fn defaults_follow_documented_constants() {
        let policy = EnginePolicy::default();
        assert_eq!(policy.network_backoff().base(), Duration::from_millis(200));
        assert_eq!(policy.timeout_backoff().base(), Duration::from_millis(500));
        assert_eq!(policy.rate_limit_backoff().base(), Duration::from_millis(1500));
        assert_eq!(policy.rate_limit_backoff().ceiling(), Duration::from_secs(120));
        assert_eq!(policy.jitter(), Jitter::None);
        assert_eq!(policy.max_retry_after(), DEFAULT_MAX_RETRY_AFTER);
        assert_eq!(policy.status_mapping(), StatusMapping::PreClassified);
    }

    #[test]
    fn network_retry_uses_exponential_curve() {
        let policy = EnginePolicy::default();
        let delays: Vec<Duration> = (1..=3)
            .map(|attempt| eval(&policy, &get(attempt, 4), Outcome::NetworkError).retry_after())
            .collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(200), Duration::from_millis(400), Duration::from_millis(800)]
        );
    }

    #[test]
    fn timeout_retry_uses_its_own_curve() {
        let d = eval(&EnginePolicy::default(), &get(1, 3), Outcome::TimeoutError);
        assert_eq!(
            d,
            Decision::Retry { reason: RetryReason::Timeout, after: Duration::from_millis(500) }
        );
    }

    #[test]
    fn rate_limit_hint_is_passed_through_and_capped() {
        let policy = EnginePolicy::default();
        let d = eval(&policy, &get(1, 3), Outcome::RateLimited { retry_after_ms: 3000 });
        assert_eq!(d.retry_after(), Duration::from_millis(3000));

        let d = eval(&policy, &get(1, 3), Outcome::RateLimited { retry_after_ms: 0 });
        assert_eq!(d, Decision::Retry { reason: RetryReason::RateLimited, after: Duration::ZERO });

        let d = eval(&policy, &get(1, 3), Outcome::RateLimited { retry_after_ms: u32::MAX });
        assert_eq!(d.retry_after(), DEFAULT_MAX_RETRY_AFTER);
    }

    #[test]
    fn hints_are_never_jittered() {
        let policy = EnginePolicy::builder().with_jitter(Jitter::full()).build().unwrap();
        for _ in 0..20 {
            let d = eval(&policy, &get(1, 3), Outcome::RateLimited { retry_after_ms: 750 });
            assert_eq!(d.retry_after(), Duration::from_millis(750));
        }
    }

    #[test]
    fn jitter_stays_under_curve() {
        let policy = EnginePolicy::builder().with_jitter(Jitter::equal()).build().unwrap();
        for _ in 0..50 {
            let after = eval(&policy, &get(2, 3), Outcome::NetworkError).retry_after();
            assert!(after >= Duration::from_millis(200) && after <= Duration::from_millis(400));
        }
    }

    #[test]
    fn jittered_delays_stay_bounded_by_the_curve() {
        let plain = EnginePolicy::default();
        let jittered = EnginePolicy::builder().with_jitter(Jitter::Full).build().unwrap();
        let mut previous = Duration::ZERO;
        for attempt in 1..=20u8 {
            let curve = plain.backoff_delay(RetryReason::Network, attempt);
            assert!(curve >= previous);
            assert!(jittered.backoff_delay(RetryReason::Network, attempt) <= curve);
            previous = curve;
        }
        assert_eq!(previous, plain.network_backoff().ceiling());
    }

    #[test]
    fn idempotency_gate_precedes_budget() {
        let policy = EnginePolicy::default();
        let post_last = RequestContext::new(HttpMethod::Post, 3, 3).unwrap();
        assert_eq!(
            eval(&policy, &post_last, Outcome::NetworkError),
            Decision::Fail { reason: FailReason::Unknown, retryable: false }
        );
    }

    #[test]
    fn opted_in_post_retries() {
        let policy = EnginePolicy::default();
        let keyed =
            RequestContext::new(HttpMethod::Post, 1, 3).unwrap().with_idempotency_key("abc");
        assert!(eval(&policy, &keyed, Outcome::TimeoutError).is_retry());
        let allowed =
            RequestContext::new(HttpMethod::Post, 1, 3).unwrap().allow_non_idempotent_retry(true);
        assert!(eval(&policy, &allowed, Outcome::TimeoutError).is_retry());
    }

    #[test]
    fn inspected_429_uses_rate_limit_curve() {
        let policy =
            EnginePolicy::builder().status_mapping(StatusMapping::Inspect).build().unwrap();
        assert_eq!(
            eval(&policy, &get(2, 3), Outcome::HttpStatus(429)),
            Decision::Retry { reason: RetryReason::RateLimited, after: Duration::from_millis(3000) }
        );
    }

    #[test]
    fn evaluate_in_carries_the_refresh_cycle() {
        let policy = EnginePolicy::default();
        let mut phase = AuthPhase::default();
        let ctx = get(1, 3);
        let step = |phase: &mut AuthPhase, outcome: Outcome| {
            let refresh = AuthDecision::RefreshAndRetry;
            policy.evaluate_in(phase, &ctx, &outcome, refresh, RefreshResult::NotAttempted)
        };

        let d = step(&mut phase, Outcome::HttpStatus(401));
        assert_eq!(d, Decision::RefreshAndRetry { reason: RetryReason::AuthExpired });
        assert!(step(&mut phase, Outcome::TimeoutError).is_retry());
        assert_eq!(phase, AuthPhase::RefreshRequested);
        let d = step(&mut phase, Outcome::HttpStatus(401));
        assert_eq!(d, Decision::Fail { reason: FailReason::AuthFailed, retryable: false });

        // The single-step form always starts a fresh cycle.
        let d = policy.evaluate(
            &ctx,
            &Outcome::HttpStatus(401),
            AuthDecision::RefreshAndRetry,
            RefreshResult::NotAttempted,
        );
        assert_eq!(d, Decision::RefreshAndRetry { reason: RetryReason::AuthExpired });
    }

    #[test]
    fn auth_backoff_is_zero() {
        let delay = EnginePolicy::default().backoff_delay(RetryReason::AuthExpired, 5);
        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn builder_rejects_zero_retry_after_cap() {
        let err = EnginePolicy::builder().max_retry_after(Duration::ZERO).build();
        assert_eq!(err, Err(BuildError::ZeroRetryAfterCap));
    }
}
