use std::time::Duration;

use crate::config::SegmentRetryConfig;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, short body, etc.).
    Connection,
    /// Any other non-2xx HTTP status.
    Http(u32),
    /// Local write failure.
    Storage,
    /// Task cancelled; never retried.
    Cancelled,
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Fixed-delay retry: up to `max_attempts` tries with `delay` between them.
/// Every failure except cancellation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SegmentRetryConfig::default())
    }
}

impl From<&SegmentRetryConfig> for RetryPolicy {
    fn from(cfg: &SegmentRetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            delay: Duration::from_millis(cfg.delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after `attempt` (1-based) failed with `kind`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || kind == ErrorKind::Cancelled {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_three_attempts_one_second() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.delay, Duration::from_secs(1));
    }

    #[test]
    fn fixed_delay_until_max_attempts() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.decide(1, ErrorKind::Http(404)),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(
            p.decide(2, ErrorKind::Timeout),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(p.decide(3, ErrorKind::Timeout), RetryDecision::NoRetry);
    }

    #[test]
    fn storage_failures_are_retried() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.decide(1, ErrorKind::Storage),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
    }

    #[test]
    fn cancellation_is_never_retried() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Cancelled), RetryDecision::NoRetry);
    }

    #[test]
    fn zero_attempts_in_config_means_one() {
        let p = RetryPolicy::from(&SegmentRetryConfig {
            max_attempts: 0,
            delay_ms: 5,
        });
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.decide(1, ErrorKind::Connection), RetryDecision::NoRetry);
    }
}
