#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # transport-core
//!
//! The retry decision engine of an HTTP client: given the outcome of one attempt and the
//! request's context, decide whether to proceed, retry, refresh credentials and retry, or fail,
//! and say why.
//!
//! The engine owns no sockets and never sleeps or refreshes credentials; it only classifies
//! and decides. The caller performs the attempt, honours the returned backoff, drives any
//! credential refresh, and increments the attempt counter.
//!
//! ## Features
//!
//! - **Outcome classification** into auth, hard-block, and retryable tracks
//! - **Idempotency gate** so non-idempotent requests are never replayed without opt-in
//! - **Bounded backoff curves** (constant, linear, exponential) with optional jitter
//! - **Two-phase auth refresh** orchestrated through the returned decisions
//! - **Live-updatable policy** shared across per-request engines
//!
//! ## Quick Start
//!
//! ```rust
//! use transport_core::{
//!     AuthDecision, Decision, DecisionEngine, HttpMethod, Outcome, RefreshResult,
//!     RequestContext,
//! };
//!
//! let mut engine = DecisionEngine::new();
//! let mut ctx = RequestContext::new(HttpMethod::Get, 1, 3).unwrap();
//! loop {
//!     let outcome = Outcome::HttpStatus(200); // perform the attempt here
//!     match engine.decide(&ctx, &outcome, AuthDecision::Fail, RefreshResult::NotAttempted) {
//!         Decision::Proceed => break,
//!         Decision::Retry { .. } => match ctx.next_attempt() {
//!             Some(next) => ctx = next,
//!             None => break,
//!         },
//!         Decision::RefreshAndRetry { .. } | Decision::Fail { .. } => break,
//!     }
//! }
//! ```

pub mod auth;
pub mod backoff;
pub mod classify;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod jitter;
pub mod model;
pub mod policy;
pub mod prelude;
pub mod shared;

// Re-exports
pub use auth::{AuthDecision, AuthPhase, RefreshResult};
pub use backoff::Backoff;
pub use classify::{PolicyTrack, StatusMapping};
pub use config::PolicyConfig;
pub use decision::{Decision, DecisionDetails, DecisionKind, FailReason, RetryReason};
pub use engine::DecisionEngine;
pub use error::InputError;
pub use jitter::Jitter;
pub use model::{HttpMethod, Outcome, OutcomeKind, RequestContext};
pub use policy::{BuildError, EnginePolicy, EnginePolicyBuilder};
pub use shared::SharedPolicy;
