//! Rate-limit and quota signals carried in response headers.

use {
    chrono::{DateTime, Utc},
    reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER},
    serde::{Deserialize, Serialize},
};

pub const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Reset values above this are absolute epoch seconds, not a delta.
const EPOCH_THRESHOLD: u64 = 1_000_000_000;

/// The parts of a response that matter for rate limiting and parsing.
///
/// `None` means the header was absent, which is "no new information" and
/// not "limit lifted".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub status: u16,
    pub retry_after_secs: Option<u64>,
    pub remaining: Option<u64>,
    pub limit: Option<u64>,
    /// Seconds until the quota window resets.
    pub reset_secs: Option<u64>,
    pub content_type: Option<String>,
}

impl ResponseMeta {
    pub fn from_headers(status: u16, headers: &HeaderMap) -> Self {
        Self::from_headers_at(status, headers, Utc::now())
    }

    pub fn from_headers_at(status: u16, headers: &HeaderMap, now: DateTime<Utc>) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        };
        let number = |name: &str| text(name).and_then(|v| v.parse::<u64>().ok());

        let reset_secs = number(RATELIMIT_RESET).map(|v| {
            if v > EPOCH_THRESHOLD {
                let now_secs = u64::try_from(now.timestamp()).unwrap_or(0);
                v.saturating_sub(now_secs)
            } else {
                v
            }
        });

        Self {
            status,
            retry_after_secs: text(RETRY_AFTER.as_str()).and_then(|v| parse_retry_after(v, now)),
            remaining: number(RATELIMIT_REMAINING),
            limit: number(RATELIMIT_LIMIT),
            reset_secs,
            content_type: text(CONTENT_TYPE.as_str()).map(ToString::to_string),
        }
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }

    /// Whether any rate-limit or quota header was present.
    #[must_use]
    pub fn has_rate_headers(&self) -> bool {
        self.retry_after_secs.is_some()
            || self.remaining.is_some()
            || self.limit.is_some()
            || self.reset_secs.is_some()
    }
}

/// `Retry-After` is either delta seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some(u64::try_from((at - now).num_seconds()).unwrap_or(0))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone, reqwest::header::HeaderValue, rstest::rstest};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case::seconds("30", Some(30))]
    #[case::padded(" 5 ", Some(5))]
    #[case::http_date("Sat, 01 Mar 2025 12:01:00 GMT", Some(60))]
    #[case::past_date("Sat, 01 Mar 2025 11:00:00 GMT", Some(0))]
    #[case::garbage("soon", None)]
    fn retry_after_forms(#[case] raw: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_retry_after(raw, now()), expected);
    }

    #[test]
    fn headers_are_extracted() {
        let mut h = HeaderMap::new();
        h.insert("retry-after", HeaderValue::from_static("30"));
        h.insert(RATELIMIT_REMAINING, HeaderValue::from_static("0"));
        h.insert(RATELIMIT_LIMIT, HeaderValue::from_static("600"));
        let reset = now().timestamp() + 90;
        h.insert(RATELIMIT_RESET, HeaderValue::from_str(&reset.to_string()).unwrap());
        h.insert("content-type", HeaderValue::from_static("application/json; charset=UTF-8"));

        let meta = ResponseMeta::from_headers_at(429, &h, now());
        assert_eq!(meta.retry_after_secs, Some(30));
        assert_eq!(meta.remaining, Some(0));
        assert_eq!(meta.limit, Some(600));
        assert_eq!(meta.reset_secs, Some(90));
        assert!(meta.is_json());
        assert!(meta.has_rate_headers());
    }

    #[test]
    fn absent_headers_stay_unknown() {
        let meta = ResponseMeta::from_headers_at(200, &HeaderMap::new(), now());
        assert!(!meta.has_rate_headers());
        assert_eq!(meta.remaining, None);
    }
}
