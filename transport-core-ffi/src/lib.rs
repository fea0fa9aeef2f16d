//! C ABI for the `transport-core` decision engine.
//!
//! A host creates one opaque client per logical request, calls `tc_decide` after every
//! attempt, and reads the details of the latest decision through the `tc_last_*` accessors.
//! See `include/transport_core.h` for the C declarations.
//!
//! Malformed input never panics across the boundary: it is logged and answered with
//! `TC_DECISION_FAIL` / fail reason Unknown, and the client's details are overwritten to match.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod abi;
pub mod error;

pub use abi::*;
pub use error::AbiError;

use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use abi::REJECTED;
use transport_core::{Decision, DecisionEngine};

/// Opaque per-request engine handle.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct transport_core_client {
    engine: DecisionEngine,
}

/// ABI version this library implements.
#[no_mangle]
pub extern "C" fn tc_abi_version() -> u32 {
    TRANSPORT_CORE_ABI_VERSION
}

/// Create a client. Returns null if construction failed; callers must check before use.
#[no_mangle]
pub extern "C" fn tc_client_new() -> *mut transport_core_client {
    match panic::catch_unwind(|| Box::new(transport_core_client::default())) {
        Ok(client) => Box::into_raw(client),
        Err(_) => {
            tracing::error!("client construction panicked");
            ptr::null_mut()
        }
    }
}

/// Destroy a client created by [`tc_client_new`]. Null is ignored.
///
/// # Safety
/// `client` must be null or a pointer returned by `tc_client_new` that has not been freed.
#[no_mangle]
pub unsafe extern "C" fn tc_client_free(client: *mut transport_core_client) {
    if client.is_null() {
        return;
    }
    guarded("tc_client_free", (), || {
        // SAFETY: allocated by Box::into_raw in tc_client_new and not yet freed.
        drop(unsafe { Box::from_raw(client) });
    })
}

/// Decide the next action for one attempt.
///
/// `refresh_result`: -1 not attempted, 0 failed, 1 succeeded. The client carries the
/// request's refresh cycle, so a second refresh is never requested through it.
///
/// # Safety
/// `client` must be null or a live pointer from `tc_client_new`, not used concurrently.
/// `ctx` and `outcome` must be null or point to valid structs; `ctx->idempotency_key` must
/// be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn tc_decide(
    client: *mut transport_core_client,
    ctx: *const tc_request_context_t,
    outcome: *const tc_outcome_t,
    auth_decision: c_int,
    refresh_result: i8,
) -> c_int {
    // SAFETY: null or a live, exclusively used client per the contract above.
    let Some(client) = (unsafe { client.as_mut() }) else {
        tracing::warn!("tc_decide called with null client");
        return TC_DECISION_FAIL;
    };

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: pointer validity is forwarded from this function's contract.
        match unsafe { decode_request(ctx, outcome, auth_decision, refresh_result) } {
            Ok(request) => client.engine.decide(
                &request.ctx,
                &request.outcome,
                request.auth_decision,
                request.refresh_result,
            ),
            Err(err) => {
                tracing::warn!(error = %err, "rejected decision input");
                client.engine.record(REJECTED);
                REJECTED
            }
        }
    }));

    let decision = result.unwrap_or_else(|_| {
        tracing::error!("decision panicked; reporting failure");
        client.engine.record(REJECTED);
        REJECTED
    });
    decision_code(&decision)
}

/// Backoff in milliseconds from the latest decision (0 unless it was Retry).
///
/// # Safety
/// `client` must be null or a live pointer from `tc_client_new`.
#[no_mangle]
pub unsafe extern "C" fn tc_last_retry_after_ms(client: *const transport_core_client) -> u32 {
    // SAFETY: null or live per the contract above.
    let client = unsafe { client.as_ref() };
    guarded("tc_last_retry_after_ms", 0, || client.map_or(0, |c| c.engine.retry_after_ms()))
}

/// Retry reason code from the latest decision (0 unless Retry/RefreshAndRetry).
///
/// # Safety
/// `client` must be null or a live pointer from `tc_client_new`.
#[no_mangle]
pub unsafe extern "C" fn tc_last_retry_reason(client: *const transport_core_client) -> u8 {
    // SAFETY: null or live per the contract above.
    let client = unsafe { client.as_ref() };
    guarded("tc_last_retry_reason", 0, || {
        client.and_then(|c| c.engine.retry_reason()).map_or(0, |reason| reason.code())
    })
}

/// Fail reason code from the latest decision (0 unless Fail).
///
/// # Safety
/// `client` must be null or a live pointer from `tc_client_new`.
#[no_mangle]
pub unsafe extern "C" fn tc_last_fail_reason(client: *const transport_core_client) -> u8 {
    // SAFETY: null or live per the contract above.
    let client = unsafe { client.as_ref() };
    guarded("tc_last_fail_reason", 0, || {
        client.and_then(|c| c.engine.fail_reason()).map_or(0, |reason| reason.code())
    })
}

/// Whether the latest failure was budget exhaustion of a retryable condition.
///
/// # Safety
/// `client` must be null or a live pointer from `tc_client_new`.
#[no_mangle]
pub unsafe extern "C" fn tc_last_fail_retryable(client: *const transport_core_client) -> bool {
    // SAFETY: null or live per the contract above.
    let client = unsafe { client.as_ref() };
    guarded("tc_last_fail_retryable", false, || client.is_some_and(|c| c.engine.fail_retryable()))
}

/// Install a stderr log subscriber filtered by `RUST_LOG`. Returns false if a global
/// subscriber is already set.
#[no_mangle]
pub extern "C" fn tc_init_logging() -> bool {
    panic::catch_unwind(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
    .unwrap_or(false)
}

/// Run `f`, answering `fallback` if it panics so no unwind crosses the C boundary.
fn guarded<T>(symbol: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        tracing::error!(symbol, "panic contained at the C boundary");
        fallback
    })
}

struct DecodedRequest {
    ctx: transport_core::RequestContext,
    outcome: transport_core::Outcome,
    auth_decision: transport_core::AuthDecision,
    refresh_result: transport_core::RefreshResult,
}

/// # Safety
/// Same pointer requirements as [`tc_decide`].
unsafe fn decode_request(
    ctx: *const tc_request_context_t,
    outcome: *const tc_outcome_t,
    auth_decision: c_int,
    refresh_result: i8,
) -> Result<DecodedRequest, AbiError> {
    // SAFETY: null or valid per the caller contract.
    let raw_ctx = unsafe { ctx.as_ref() }.ok_or(AbiError::NullPointer("context"))?;
    // SAFETY: null or valid per the caller contract.
    let raw_outcome = unsafe { outcome.as_ref() }.ok_or(AbiError::NullPointer("outcome"))?;
    Ok(DecodedRequest {
        // SAFETY: idempotency_key requirements forwarded from the caller contract.
        ctx: unsafe { abi::decode_context(raw_ctx) }?,
        outcome: abi::decode_outcome(raw_outcome)?,
        auth_decision: abi::decode_auth_decision(auth_decision)?,
        refresh_result: abi::decode_refresh_result(refresh_result)?,
    })
}

fn decision_code(decision: &Decision) -> c_int {
    c_int::from(decision.kind() as u8)
}
