use std::time::{Duration, SystemTime};

use http::header::RETRY_AFTER;
use http::StatusCode;

pub(crate) const RETRY_AFTER_MAX_SECS: u64 = 30;
pub(crate) const ERROR_BODY_MAX_CHARS: usize = 512;

/// HTTP-level classification of an endpoint response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    Success,
    RateLimited,
    PaymentRequired,
    Failure,
}

#[inline]
pub(crate) fn classify_status(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        429 => StatusClass::RateLimited,
        402 => StatusClass::PaymentRequired,
        _ if status.is_success() => StatusClass::Success,
        _ => StatusClass::Failure,
    }
}

/// Parse `Retry-After` as delta-seconds or an HTTP date, capped at 30 s.
#[inline]
pub(crate) fn parse_retry_after_delay(headers: &http::HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds.min(RETRY_AFTER_MAX_SECS)));
    }

    let target = httpdate::parse_http_date(raw).ok()?;
    let delay = target.duration_since(SystemTime::now()).unwrap_or_default();
    Some(delay.min(Duration::from_secs(RETRY_AFTER_MAX_SECS)))
}

/// Shorten an error body for logs and error messages.
pub(crate) fn truncate_error_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(ERROR_BODY_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), StatusClass::Success);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::RateLimited
        );
        assert_eq!(
            classify_status(StatusCode::PAYMENT_REQUIRED),
            StatusClass::PaymentRequired
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            StatusClass::Failure
        );
        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusClass::Failure);
        assert_eq!(
            classify_status(StatusCode::MOVED_PERMANENTLY),
            StatusClass::Failure
        );
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = http::HeaderMap::new();
        headers.insert(RETRY_AFTER, http::HeaderValue::from_static("5"));
        let delay = parse_retry_after_delay(&headers).unwrap();
        assert_eq!(delay, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_retry_after_is_capped() {
        let mut headers = http::HeaderMap::new();
        headers.insert(RETRY_AFTER, http::HeaderValue::from_static("3600"));
        let delay = parse_retry_after_delay(&headers).unwrap();
        assert_eq!(delay, Duration::from_secs(RETRY_AFTER_MAX_SECS));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let target = SystemTime::now() + Duration::from_secs(2);
        let mut headers = http::HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            http::HeaderValue::from_str(&httpdate::fmt_http_date(target)).unwrap(),
        );
        let delay = parse_retry_after_delay(&headers).unwrap();
        assert!(delay <= Duration::from_secs(RETRY_AFTER_MAX_SECS));
    }

    #[test]
    fn test_parse_retry_after_invalid_or_missing() {
        let mut headers = http::HeaderMap::new();
        assert!(parse_retry_after_delay(&headers).is_none());
        headers.insert(RETRY_AFTER, http::HeaderValue::from_static("not-a-delay"));
        assert!(parse_retry_after_delay(&headers).is_none());
    }

    #[test]
    fn test_truncate_error_body() {
        assert_eq!(truncate_error_body(b"  upstream down \n"), "upstream down");
        let long = "x".repeat(ERROR_BODY_MAX_CHARS + 10);
        let truncated = truncate_error_body(long.as_bytes());
        assert_eq!(truncated.len(), ERROR_BODY_MAX_CHARS + 3);
        assert!(truncated.ends_with("..."));
    }
}
