//! Request and outcome data fed into the engine.
//!
//! A [`RequestContext`] describes the logical request and how far through its attempt budget it
//! is; an [`Outcome`] describes what happened on the attempt that was just made. Both are plain
//! values owned by the caller and borrowed by the engine for the duration of one decision.

use crate::error::InputError;
use std::fmt;
use std::str::FromStr;

/// HTTP methods understood by the idempotency gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// All supported methods, in boundary code order.
    pub const ALL: [HttpMethod; 6] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Whether replaying the request is safe without caller opt-in.
    ///
    /// `PUT` and `DELETE` count as idempotent by convention; only `POST` is not.
    pub fn is_idempotent(self) -> bool {
        !matches!(self, HttpMethod::Post)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| InputError::UnknownMethod(s.to_string()))
    }
}

/// Per-attempt description of the logical request being retried.
///
/// Invariant: `1 <= attempt <= max_attempts <= 255`, enforced by [`RequestContext::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    method: HttpMethod,
    attempt: u8,
    max_attempts: u8,
    allow_non_idempotent_retry: bool,
    idempotency_key: Option<String>,
}

impl RequestContext {
    /// Build a context for `attempt` (1-based, counting the attempt just made) out of
    /// `max_attempts` permissible attempts.
    pub fn new(method: HttpMethod, attempt: u8, max_attempts: u8) -> Result<Self, InputError> {
        if max_attempts == 0 {
            return Err(InputError::ZeroMaxAttempts);
        }
        if attempt == 0 {
            return Err(InputError::ZeroAttempt);
        }
        if attempt > max_attempts {
            return Err(InputError::AttemptExceedsMax { attempt, max_attempts });
        }
        Ok(Self {
            method,
            attempt,
            max_attempts,
            allow_non_idempotent_retry: false,
            idempotency_key: None,
        })
    }

    /// Explicitly opt in to retrying non-idempotent methods.
    pub fn allow_non_idempotent_retry(mut self, allow: bool) -> Self {
        self.allow_non_idempotent_retry = allow;
        self
    }

    /// Attach a token that makes the request safely replayable regardless of method.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn attempt(&self) -> u8 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    pub fn allows_non_idempotent_retry(&self) -> bool {
        self.allow_non_idempotent_retry
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// True when this is the last attempt the budget permits.
    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// True when a retry could not produce duplicate side effects.
    pub fn is_replay_safe(&self) -> bool {
        self.method.is_idempotent()
            || self.allow_non_idempotent_retry
            || self.idempotency_key.is_some()
    }

    /// Context for the following attempt, or `None` once the budget is spent.
    pub fn next_attempt(&self) -> Option<Self> {
        if self.is_last_attempt() {
            return None;
        }
        Some(Self { attempt: self.attempt + 1, ..self.clone() })
    }
}

/// Discriminant of an [`Outcome`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutcomeKind {
    NetworkError,
    TimeoutError,
    HttpStatus,
    RateLimited,
    Blocked,
    Captcha,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 6] = [
        OutcomeKind::NetworkError,
        OutcomeKind::TimeoutError,
        OutcomeKind::HttpStatus,
        OutcomeKind::RateLimited,
        OutcomeKind::Blocked,
        OutcomeKind::Captcha,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::NetworkError => "NetworkError",
            OutcomeKind::TimeoutError => "TimeoutError",
            OutcomeKind::HttpStatus => "HttpStatus",
            OutcomeKind::RateLimited => "RateLimited",
            OutcomeKind::Blocked => "Blocked",
            OutcomeKind::Captcha => "Captcha",
        }
    }
}

impl FromStr for OutcomeKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutcomeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| InputError::UnknownOutcomeKind(s.to_string()))
    }
}

/// Result of the attempt just made, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// Connection-level failure (reset, DNS, refused).
    NetworkError,
    /// The attempt did not complete in time.
    TimeoutError,
    /// A response arrived with this status code.
    HttpStatus(u16),
    /// The server asked the client to slow down; `retry_after_ms` may be 0.
    RateLimited { retry_after_ms: u32 },
    /// The server refuses this client outright.
    Blocked,
    /// The server demands a human challenge.
    Captcha,
}

impl Outcome {
    /// Assemble an outcome from boundary-style flat fields, ignoring those that do not apply
    /// to `kind`.
    pub fn from_parts(kind: OutcomeKind, http_status: u16, retry_after_ms: u32) -> Self {
        match kind {
            OutcomeKind::NetworkError => Outcome::NetworkError,
            OutcomeKind::TimeoutError => Outcome::TimeoutError,
            OutcomeKind::HttpStatus => Outcome::HttpStatus(http_status),
            OutcomeKind::RateLimited => Outcome::RateLimited { retry_after_ms },
            OutcomeKind::Blocked => Outcome::Blocked,
            OutcomeKind::Captcha => Outcome::Captcha,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::NetworkError => OutcomeKind::NetworkError,
            Outcome::TimeoutError => OutcomeKind::TimeoutError,
            Outcome::HttpStatus(_) => OutcomeKind::HttpStatus,
            Outcome::RateLimited { .. } => OutcomeKind::RateLimited,
            Outcome::Blocked => OutcomeKind::Blocked,
            Outcome::Captcha => OutcomeKind::Captcha,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::HttpStatus(status) => write!(f, "HttpStatus({})", status),
            Outcome::RateLimited { retry_after_ms } => {
                write!(f, "RateLimited(retry_after={}ms)", retry_after_ms)
            }
            other => f.write_str(other.kind().as_str()),
        }
    }
}
