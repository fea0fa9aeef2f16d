//! Errors raised while decoding data that crossed the C boundary.

use std::os::raw::c_int;
use transport_core::InputError;

/// Boundary input that cannot be turned into engine types.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("null {0} pointer")]
    NullPointer(&'static str),
    #[error("invalid HTTP method code: {0}")]
    InvalidMethod(c_int),
    #[error("invalid outcome kind code: {0}")]
    InvalidOutcomeKind(c_int),
    #[error("invalid auth decision code: {0}")]
    InvalidAuthDecision(c_int),
    #[error("invalid refresh result code: {0} (expected -1, 0, or 1)")]
    InvalidRefreshResult(i8),
    #[error("invalid request context: {0}")]
    Context(#[from] InputError),
}
