use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tracing::warn;

// https://docs.sentry.io/api/ratelimits/
pub const HEADER_RATE_LIMIT: &str = "X-Sentry-Rate-Limit-Limit";
pub const HEADER_RATE_REMAINING: &str = "X-Sentry-Rate-Limit-Remaining";
pub const HEADER_RATE_RESET: &str = "X-Sentry-Rate-Limit-Reset";
pub const HEADER_RATE_CONCURRENT_LIMIT: &str = "X-Sentry-Rate-Limit-ConcurrentLimit";
pub const HEADER_RATE_CONCURRENT_REMAINING: &str = "X-Sentry-Rate-Limit-ConcurrentRemaining";

/// Point-in-time rate limit counters reported by a single response.
///
/// Every field stays at its zero value when the matching header is absent or
/// not numeric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rate {
    /// The maximum number of requests allowed within the window.
    pub limit: u32,
    /// Requests this caller has left on this endpoint within the current window.
    pub remaining: u32,
    /// When the next window begins and the count resets.
    pub reset: Option<DateTime<Utc>>,
    /// The maximum number of concurrent requests allowed within the window.
    pub concurrent_limit: u32,
    /// Concurrent requests this caller has left within the current window.
    pub concurrent_remaining: u32,
}

impl Rate {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let rate = Self {
            limit: header_number(headers, HEADER_RATE_LIMIT).unwrap_or_default(),
            remaining: header_number(headers, HEADER_RATE_REMAINING).unwrap_or_default(),
            reset: header_number::<i64>(headers, HEADER_RATE_RESET)
                .filter(|secs| *secs != 0)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            concurrent_limit: header_number(headers, HEADER_RATE_CONCURRENT_LIMIT)
                .unwrap_or_default(),
            concurrent_remaining: header_number(headers, HEADER_RATE_CONCURRENT_REMAINING)
                .unwrap_or_default(),
        };

        if rate.limit > 0 {
            let used = rate.limit.saturating_sub(rate.remaining);
            let usage_pct = (used as f64 / rate.limit as f64) * 100.0;
            if usage_pct > 80.0 {
                warn!(
                    remaining = rate.remaining,
                    limit = rate.limit,
                    usage_pct = format!("{:.1}%", usage_pct),
                    "Rate limit usage high"
                );
            }
        }

        rate
    }

    /// Seconds until the window resets, if the server told us when.
    pub fn seconds_until_reset(&self) -> Option<i64> {
        self.reset.map(|reset| (reset - Utc::now()).num_seconds().max(0))
    }
}

/// True when the server explicitly reported an empty request or concurrency
/// budget. Missing counters never count as exhausted.
pub(crate) fn budget_exhausted(headers: &HeaderMap) -> bool {
    header_number::<u32>(headers, HEADER_RATE_REMAINING) == Some(0)
        || header_number::<u32>(headers, HEADER_RATE_CONCURRENT_REMAINING) == Some(0)
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}
