use crate::config::FetchConfig;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Bounded retry schedule for 429 responses.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first request included
    pub max_attempts: u32,
    /// Wait used when the response has no usable Retry-After
    pub default_retry_after: Duration,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            default_retry_after: Duration::from_secs(config.default_retry_after_seconds),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_backoff: Duration::from_secs(config.max_backoff_seconds),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt after `attempt` (1-based) was throttled.
    ///
    /// The provider hint is honored as a floor under the exponential
    /// backoff, and the result never exceeds `max_backoff`.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_backoff.saturating_mul(1u32 << exponent);
        let hinted = retry_after.unwrap_or(self.default_retry_after);
        hinted.max(backoff).min(self.max_backoff)
    }
}

/// `Retry-After` as delta-seconds. HTTP-date values are not understood and
/// yield `None`.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            default_retry_after: Duration::from_secs(10),
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_hint_wins_when_larger() {
        let p = policy();
        assert_eq!(p.delay(1, Some(Duration::from_secs(2))), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_grows_past_small_hint() {
        let p = policy();
        let hint = Some(Duration::ZERO);
        assert_eq!(p.delay(1, hint), Duration::from_millis(500));
        assert_eq!(p.delay(2, hint), Duration::from_millis(1000));
        assert_eq!(p.delay(4, hint), Duration::from_millis(4000));
    }

    #[test]
    fn test_missing_hint_uses_default_and_cap_applies() {
        let p = policy();
        assert_eq!(p.delay(1, None), Duration::from_secs(10));
        assert_eq!(p.delay(30, None), Duration::from_secs(60));
        assert_eq!(p.delay(1, Some(Duration::from_secs(3600))), Duration::from_secs(60));
    }

    #[test]
    fn test_from_fetch_config() {
        let config = FetchConfig {
            max_attempts: 0,
            base_backoff_ms: 5,
            ..FetchConfig::default()
        };
        let p = RetryPolicy::from(&config);
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.base_backoff, Duration::from_millis(5));
        assert_eq!(p.default_retry_after, Duration::from_secs(10));
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(2)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }
}
