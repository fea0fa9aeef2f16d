//! Error types for engine inputs.
//!
//! The decision call itself cannot fail; these errors surface earlier, when a caller builds a
//! [`RequestContext`](crate::RequestContext) or parses names coming from configuration or test
//! vectors.

/// Rejected input while building request data for the engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// `attempt` is 1-based; zero means no attempt has been made yet.
    #[error("attempt must be >= 1 (got 0)")]
    ZeroAttempt,
    /// A request needs at least one permissible attempt.
    #[error("max_attempts must be >= 1 (got 0)")]
    ZeroMaxAttempts,
    /// The caller evaluated an attempt the budget never allowed.
    #[error("attempt ({attempt}) exceeds max_attempts ({max_attempts})")]
    AttemptExceedsMax { attempt: u8, max_attempts: u8 },
    /// Method name not in the supported set.
    #[error("unknown HTTP method: {0}")]
    UnknownMethod(String),
    /// Outcome kind name not in the supported set.
    #[error("unknown outcome kind: {0}")]
    UnknownOutcomeKind(String),
}
