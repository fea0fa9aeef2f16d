//! Convenient re-exports for common transport-core types.
pub use crate::{
    auth::{AuthDecision, AuthPhase, RefreshResult},
    backoff::{Backoff, BackoffError, DEFAULT_CEILING},
    classify::{classify, PolicyTrack, StatusMapping},
    config::PolicyConfig,
    decision::{Decision, DecisionDetails, DecisionKind, FailReason, RetryReason},
    engine::DecisionEngine,
    error::InputError,
    jitter::Jitter,
    model::{HttpMethod, Outcome, OutcomeKind, RequestContext},
    policy::{BuildError, EnginePolicy, EnginePolicyBuilder, DEFAULT_MAX_RETRY_AFTER},
    shared::SharedPolicy,
};
