//! `#[repr(C)]` types and enum codes mirrored by `include/transport_core.h`.
//!
//! Enum-typed fields arrive as plain integers and are range-checked here; a C caller can put
//! any value into an enum slot, so nothing is converted without validation.

#![allow(non_camel_case_types)]

use crate::error::AbiError;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use transport_core::{
    AuthDecision, Decision, FailReason, HttpMethod, Outcome, OutcomeKind, RefreshResult,
    RequestContext,
};

/// Bumped whenever a struct layout, code, or exported signature changes.
pub const TRANSPORT_CORE_ABI_VERSION: u32 = 1;

pub const TC_DECISION_PROCEED: c_int = 0;
pub const TC_DECISION_RETRY: c_int = 1;
pub const TC_DECISION_REFRESH_AND_RETRY: c_int = 2;
pub const TC_DECISION_FAIL: c_int = 3;

pub const TC_AUTH_REFRESH_AND_RETRY: c_int = 0;
pub const TC_AUTH_FAIL: c_int = 1;

pub const TC_REFRESH_NOT_ATTEMPTED: i8 = -1;
pub const TC_REFRESH_FAILED: i8 = 0;
pub const TC_REFRESH_SUCCEEDED: i8 = 1;

/// Request context as laid out by C callers.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct tc_request_context_t {
    pub method: c_int,
    pub attempt: u8,
    pub max_attempts: u8,
    pub allow_non_idempotent_retry: bool,
    /// Nullable, NUL-terminated.
    pub idempotency_key: *const c_char,
}

/// Attempt outcome as laid out by C callers. `http_status` applies to `HttpStatus` only,
/// `retry_after_ms` to `RateLimited` only.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct tc_outcome_t {
    pub kind: c_int,
    pub http_status: u16,
    pub retry_after_ms: u32,
}

/// The decision every rejected input resolves to.
pub(crate) const REJECTED: Decision =
    Decision::Fail { reason: FailReason::Unknown, retryable: false };

pub(crate) fn decode_method(code: c_int) -> Result<HttpMethod, AbiError> {
    usize::try_from(code)
        .ok()
        .and_then(|idx| HttpMethod::ALL.get(idx).copied())
        .ok_or(AbiError::InvalidMethod(code))
}

pub(crate) fn decode_outcome_kind(code: c_int) -> Result<OutcomeKind, AbiError> {
    usize::try_from(code)
        .ok()
        .and_then(|idx| OutcomeKind::ALL.get(idx).copied())
        .ok_or(AbiError::InvalidOutcomeKind(code))
}

pub(crate) fn decode_auth_decision(code: c_int) -> Result<AuthDecision, AbiError> {
    match code {
        TC_AUTH_REFRESH_AND_RETRY => Ok(AuthDecision::RefreshAndRetry),
        TC_AUTH_FAIL => Ok(AuthDecision::Fail),
        other => Err(AbiError::InvalidAuthDecision(other)),
    }
}

pub(crate) fn decode_refresh_result(code: i8) -> Result<RefreshResult, AbiError> {
    match code {
        TC_REFRESH_NOT_ATTEMPTED => Ok(RefreshResult::NotAttempted),
        TC_REFRESH_FAILED => Ok(RefreshResult::Failed),
        TC_REFRESH_SUCCEEDED => Ok(RefreshResult::Succeeded),
        other => Err(AbiError::InvalidRefreshResult(other)),
    }
}

pub(crate) fn decode_outcome(raw: &tc_outcome_t) -> Result<Outcome, AbiError> {
    let kind = decode_outcome_kind(raw.kind)?;
    Ok(Outcome::from_parts(kind, raw.http_status, raw.retry_after_ms))
}

/// # Safety
/// `raw.idempotency_key` must be null or point to a NUL-terminated string valid for reads.
pub(crate) unsafe fn decode_context(
    raw: &tc_request_context_t,
) -> Result<RequestContext, AbiError> {
    let method = decode_method(raw.method)?;
    let mut ctx = RequestContext::new(method, raw.attempt, raw.max_attempts)?
        .allow_non_idempotent_retry(raw.allow_non_idempotent_retry);
    if !raw.idempotency_key.is_null() {
        // SAFETY: non-null and NUL-terminated per the caller contract.
        let key = unsafe { CStr::from_ptr(raw.idempotency_key) };
        ctx = ctx.with_idempotency_key(key.to_string_lossy().into_owned());
    }
    Ok(ctx)
}
