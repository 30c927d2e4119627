//! Retry policies for HTTP requests.

use std::time::Duration;

/// Retry policy for an HTTP request.
#[derive(Debug, Clone, Default)]
pub enum RetryPolicy {
    /// No retries — the default for mutating endpoints.
    #[default]
    None,
    /// Retry transport failures and 429/502/503/504 with capped doubling
    /// backoff. Default for reads.
    Idempotent,
    /// Caller-provided retry behavior.
    Custom(RetryConfig),
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retry attempts, not counting the initial request.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Add up to ±25% random skew to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before retry `attempt` (0-indexed): doubles from
    /// `initial_delay`, capped at `max_delay`, optionally jittered.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(16);
        let base = self
            .initial_delay
            .saturating_mul(1u32.checked_shl(exp).unwrap_or(u32::MAX))
            .min(self.max_delay);

        if !self.jitter {
            return base;
        }

        let base_ms = base.as_millis() as f64;
        let skew = (rand::random::<f64>() - 0.5) * 0.5 * base_ms;
        Duration::from_millis((base_ms + skew).max(0.0) as u64)
    }
}

/// Whether an HTTP status warrants a retry under `Idempotent`.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_without_jitter() {
        let config = RetryConfig {
            jitter: false,
            ..Default::default()
        };
        assert_eq!(config.delay_for_attempt(0).as_millis(), 200);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 400);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 800);
    }

    #[test]
    fn test_delay_caps_at_max() {
        let config = RetryConfig {
            max_retries: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(2),
            jitter: false,
        };
        assert_eq!(config.delay_for_attempt(8).as_millis(), 2000);
    }

    #[test]
    fn test_jittered_delay_stays_near_base() {
        let config = RetryConfig::default();
        let delay = config.delay_for_attempt(0).as_millis() as f64;
        assert!((150.0..=250.0).contains(&delay));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(500));
    }
}
