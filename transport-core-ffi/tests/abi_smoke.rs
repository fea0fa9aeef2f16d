use std::ffi::CString;
use std::ptr;
use transport_core_ffi::*;

fn get_ctx(attempt: u8, max_attempts: u8) -> tc_request_context_t {
    tc_request_context_t {
        method: 0,
        attempt,
        max_attempts,
        allow_non_idempotent_retry: false,
        idempotency_key: ptr::null(),
    }
}

fn outcome(kind: i32, http_status: u16, retry_after_ms: u32) -> tc_outcome_t {
    tc_outcome_t { kind, http_status, retry_after_ms }
}

struct Client(*mut transport_core_client);

impl Client {
    fn new() -> Self {
        let raw = tc_client_new();
        assert!(!raw.is_null(), "client allocation");
        Client(raw)
    }

    fn decide(
        &self,
        ctx: &tc_request_context_t,
        outcome: &tc_outcome_t,
        auth: i32,
        refresh: i8,
    ) -> i32 {
        unsafe { tc_decide(self.0, ctx, outcome, auth, refresh) }
    }

    fn plain(&self, ctx: &tc_request_context_t, outcome: &tc_outcome_t) -> i32 {
        self.decide(ctx, outcome, TC_AUTH_FAIL, TC_REFRESH_NOT_ATTEMPTED)
    }

    fn unauthorized(&self, attempt: u8, refresh: i8) -> i32 {
        self.decide(&get_ctx(attempt, 3), &outcome(2, 401, 0), TC_AUTH_REFRESH_AND_RETRY, refresh)
    }

    fn details(&self) -> (u32, u8, u8, bool) {
        unsafe {
            (
                tc_last_retry_after_ms(self.0),
                tc_last_retry_reason(self.0),
                tc_last_fail_reason(self.0),
                tc_last_fail_retryable(self.0),
            )
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        unsafe { tc_client_free(self.0) }
    }
}

#[test]
fn abi_version_matches_header() {
    assert_eq!(tc_abi_version(), 1);
}

#[test]
fn fresh_client_reports_empty_details() {
    let client = Client::new();
    assert_eq!(client.details(), (0, 0, 0, false));
}

#[test]
fn rate_limited_with_retry_after() {
    let client = Client::new();
    let d = client.plain(&get_ctx(1, 3), &outcome(3, 0, 3000));
    assert_eq!(d, TC_DECISION_RETRY);
    assert_eq!(client.details(), (3000, 3, 0, false));
}

#[test]
fn auth_401_refresh_round_trip() {
    let client = Client::new();
    assert_eq!(client.unauthorized(1, TC_REFRESH_NOT_ATTEMPTED), TC_DECISION_REFRESH_AND_RETRY);
    assert_eq!(client.details(), (0, 4, 0, false));

    assert_eq!(client.unauthorized(2, TC_REFRESH_SUCCEEDED), TC_DECISION_RETRY);
    assert_eq!(client.details(), (0, 4, 0, false));

    let client = Client::new();
    client.unauthorized(1, TC_REFRESH_NOT_ATTEMPTED);
    assert_eq!(client.unauthorized(2, TC_REFRESH_FAILED), TC_DECISION_FAIL);
    assert_eq!(client.details(), (0, 0, 2, false));
}

#[test]
fn unanswered_refresh_request_fails() {
    let client = Client::new();
    let codes: Vec<i32> =
        (0..3).map(|_| client.unauthorized(1, TC_REFRESH_NOT_ATTEMPTED)).collect();
    assert_eq!(codes, vec![TC_DECISION_REFRESH_AND_RETRY, TC_DECISION_FAIL, TC_DECISION_FAIL]);
    assert_eq!(client.details(), (0, 0, 2, false));
}

#[test]
fn second_auth_failure_after_refresh_fails() {
    let client = Client::new();
    client.unauthorized(1, TC_REFRESH_NOT_ATTEMPTED);
    assert_eq!(client.unauthorized(1, TC_REFRESH_SUCCEEDED), TC_DECISION_RETRY);
    assert_eq!(client.unauthorized(2, TC_REFRESH_NOT_ATTEMPTED), TC_DECISION_FAIL);
    assert_eq!(client.details(), (0, 0, 2, false));
}

#[test]
fn budget_exhaustion_is_flagged_retryable() {
    let client = Client::new();
    let d = client.plain(&get_ctx(3, 3), &outcome(0, 0, 0));
    assert_eq!(d, TC_DECISION_FAIL);
    assert_eq!(client.details(), (0, 0, 1, true));
}

#[test]
fn captcha_is_hard_blocked() {
    let client = Client::new();
    let (ctx, captcha) = (get_ctx(1, 3), outcome(5, 0, 0));
    let d = client.decide(&ctx, &captcha, TC_AUTH_REFRESH_AND_RETRY, TC_REFRESH_SUCCEEDED);
    assert_eq!(d, TC_DECISION_FAIL);
    assert_eq!(client.details(), (0, 0, 3, false));
}

#[test]
fn post_with_idempotency_key_retries() {
    let key = CString::new("order-7").unwrap();
    let ctx = tc_request_context_t { method: 1, idempotency_key: key.as_ptr(), ..get_ctx(1, 3) };
    let client = Client::new();
    let d = client.plain(&ctx, &outcome(1, 0, 0));
    assert_eq!(d, TC_DECISION_RETRY);

    let bare = tc_request_context_t { method: 1, ..get_ctx(1, 3) };
    let d = client.plain(&bare, &outcome(1, 0, 0));
    assert_eq!(d, TC_DECISION_FAIL);
    assert_eq!(client.details(), (0, 0, 255, false));
}

#[test]
fn success_proceeds_and_clears_details() {
    let client = Client::new();
    client.plain(&get_ctx(3, 3), &outcome(0, 0, 0));
    let d = client.plain(&get_ctx(1, 3), &outcome(2, 200, 0));
    assert_eq!(d, TC_DECISION_PROCEED);
    assert_eq!(client.details(), (0, 0, 0, false));
}

#[test]
fn malformed_input_fails_without_panicking() {
    let client = Client::new();
    let cases: Vec<(tc_request_context_t, tc_outcome_t, i32, i8)> = vec![
        (tc_request_context_t { method: 9, ..get_ctx(1, 3) }, outcome(0, 0, 0), TC_AUTH_FAIL, -1),
        (get_ctx(0, 3), outcome(0, 0, 0), TC_AUTH_FAIL, -1),
        (get_ctx(4, 3), outcome(0, 0, 0), TC_AUTH_FAIL, -1),
        (get_ctx(1, 3), outcome(42, 0, 0), TC_AUTH_FAIL, -1),
        (get_ctx(1, 3), outcome(0, 0, 0), 5, -1),
        (get_ctx(1, 3), outcome(0, 0, 0), TC_AUTH_FAIL, 3),
    ];
    for (ctx, out, auth, refresh) in cases {
        let d = client.decide(&ctx, &out, auth, refresh);
        assert_eq!(d, TC_DECISION_FAIL);
        assert_eq!(client.details(), (0, 0, 255, false));
    }
}

#[test]
fn null_pointers_are_tolerated() {
    let client = Client::new();
    let d = unsafe { tc_decide(client.0, ptr::null(), &outcome(0, 0, 0), TC_AUTH_FAIL, -1) };
    assert_eq!(d, TC_DECISION_FAIL);
    assert_eq!(client.details().2, 255);

    let d = unsafe { tc_decide(client.0, &get_ctx(1, 3), ptr::null(), TC_AUTH_FAIL, -1) };
    assert_eq!(d, TC_DECISION_FAIL);

    let d = unsafe {
        tc_decide(ptr::null_mut(), &get_ctx(1, 3), &outcome(0, 0, 0), TC_AUTH_FAIL, -1)
    };
    assert_eq!(d, TC_DECISION_FAIL);
    unsafe {
        assert_eq!(tc_last_retry_after_ms(ptr::null()), 0);
        assert_eq!(tc_last_retry_reason(ptr::null()), 0);
        assert_eq!(tc_last_fail_reason(ptr::null()), 0);
        assert!(!tc_last_fail_retryable(ptr::null()));
        tc_client_free(ptr::null_mut());
    }
}
