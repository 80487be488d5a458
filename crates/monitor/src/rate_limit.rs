//! Per-provider rate-limit state derived from response status and headers.

use {meetbridge_api::ResponseMeta, serde::Serialize};

/// How long a rate limit without a `Retry-After` or reset hint is assumed to
/// last.
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitState {
    pub limited: bool,
    /// Epoch ms of the response that set `limited`.
    pub limited_at_ms: Option<u64>,
    pub retry_after_secs: Option<u64>,
    pub remaining: Option<u64>,
    pub limit: Option<u64>,
    pub reset_secs: Option<u64>,
    /// Epoch ms of the last response that carried any signal.
    pub updated_at_ms: Option<u64>,
}

impl RateLimitState {
    /// Epoch ms at which a limit stops applying.
    #[must_use]
    pub fn expires_at_ms(&self) -> Option<u64> {
        let at = self.limited_at_ms?;
        let secs = self
            .retry_after_secs
            .or(self.reset_secs)
            .unwrap_or(DEFAULT_COOLDOWN_SECS);
        Some(at.saturating_add(secs.saturating_mul(1000)))
    }

    /// Whether the provider should be treated as limited at `now_ms`.
    #[must_use]
    pub fn is_limited_at(&self, now_ms: u64) -> bool {
        self.limited && self.expires_at_ms().is_some_and(|until| now_ms < until)
    }
}

/// Whether a single response signals a rate limit: HTTP 429, a remaining
/// count of zero, or an explicit `Retry-After`.
#[must_use]
pub fn signals_limit(status: u16, meta: Option<&ResponseMeta>) -> bool {
    status == 429
        || meta.is_some_and(|m| m.remaining == Some(0) || m.retry_after_secs.is_some())
}

/// Fold one response into the previous state.
///
/// Pure and idempotent: applying the same response twice at the same instant
/// yields the same state. A response without rate headers and without a 429
/// carries no information and leaves `previous` untouched.
#[must_use]
pub fn classify(
    previous: &RateLimitState,
    status: u16,
    meta: Option<&ResponseMeta>,
    now_ms: u64,
) -> RateLimitState {
    let has_headers = meta.is_some_and(ResponseMeta::has_rate_headers);
    if !signals_limit(status, meta) && !has_headers {
        return previous.clone();
    }

    let pick = |f: fn(&ResponseMeta) -> Option<u64>, old: Option<u64>| meta.and_then(f).or(old);
    let remaining = pick(|m| m.remaining, previous.remaining);
    let limit = pick(|m| m.limit, previous.limit);
    let reset_secs = pick(|m| m.reset_secs, previous.reset_secs);

    if signals_limit(status, meta) {
        RateLimitState {
            limited: true,
            limited_at_ms: Some(now_ms),
            retry_after_secs: meta.and_then(|m| m.retry_after_secs),
            remaining,
            limit,
            reset_secs,
            updated_at_ms: Some(now_ms),
        }
    } else {
        RateLimitState {
            limited: false,
            limited_at_ms: None,
            retry_after_secs: None,
            remaining,
            limit,
            reset_secs,
            updated_at_ms: Some(now_ms),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    const NOW: u64 = 1_700_000_000_000;

    fn meta(retry_after: Option<u64>, remaining: Option<u64>) -> ResponseMeta {
        ResponseMeta {
            retry_after_secs: retry_after,
            remaining,
            ..Default::default()
        }
    }

    #[rstest]
    #[case::too_many_requests(429, None, true)]
    #[case::remaining_zero(200, Some(meta(None, Some(0))), true)]
    #[case::retry_after(503, Some(meta(Some(5), None)), true)]
    #[case::plenty_left(200, Some(meta(None, Some(40))), false)]
    #[case::server_error(500, None, false)]
    fn limit_signals(
        #[case] status: u16,
        #[case] meta: Option<ResponseMeta>,
        #[case] expected: bool,
    ) {
        assert_eq!(signals_limit(status, meta.as_ref()), expected);
    }

    #[test]
    fn retry_after_bounds_the_limit() {
        let m = meta(Some(30), None);
        let state = classify(&RateLimitState::default(), 429, Some(&m), NOW);
        assert!(state.is_limited_at(NOW));
        assert!(state.is_limited_at(NOW + 29_999));
        assert!(!state.is_limited_at(NOW + 30_000));
    }

    #[test]
    fn classify_is_idempotent() {
        let m = meta(Some(30), Some(0));
        let once = classify(&RateLimitState::default(), 429, Some(&m), NOW);
        let twice = classify(&once, 429, Some(&m), NOW);
        assert_eq!(once, twice);
    }

    #[test]
    fn absent_headers_keep_previous_state() {
        let m = meta(Some(30), None);
        let limited = classify(&RateLimitState::default(), 429, Some(&m), NOW);
        let after = classify(&limited, 200, Some(&ResponseMeta::default()), NOW + 1000);
        assert_eq!(after, limited);
        let after = classify(&limited, 0, None, NOW + 1000);
        assert_eq!(after, limited);
    }

    #[test]
    fn fresh_headers_lift_the_limit() {
        let limited = classify(&RateLimitState::default(), 429, None, NOW);
        assert!(limited.is_limited_at(NOW + 1000));
        let lifted = classify(&limited, 200, Some(&meta(None, Some(99))), NOW + 2000);
        assert!(!lifted.limited);
        assert_eq!(lifted.remaining, Some(99));
    }

    #[test]
    fn limit_without_hint_uses_cooldown() {
        let limited = classify(&RateLimitState::default(), 429, None, NOW);
        assert_eq!(
            limited.expires_at_ms(),
            Some(NOW + DEFAULT_COOLDOWN_SECS * 1000)
        );
    }
}
