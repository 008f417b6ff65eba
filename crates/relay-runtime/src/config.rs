//! Runtime configuration.

use std::time::Duration;

use tracing::warn;

/// Configuration for capture and dispatch.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How often a capture session polls the adapter.
    pub poll_interval: Duration,
    /// Consecutive stable polls that conclude a capture.
    pub stable_threshold: u32,
    /// Hard ceiling on one capture session.
    pub capture_timeout: Duration,
    /// Delivery attempts per dispatch, the first included.
    pub max_dispatch_attempts: u32,
    /// Pause between delivery attempts.
    pub retry_delay: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            stable_threshold: 4,
            capture_timeout: Duration::from_secs(600),
            max_dispatch_attempts: 3,
            retry_delay: Duration::from_secs(1),
            event_capacity: 256,
        }
    }
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `RELAY_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; unparsable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(key = %key, value = %raw, "ignoring invalid override");
                    None
                }
            }
        };

        if let Some(ms) = number("RELAY_POLL_INTERVAL_MS").filter(|ms| *ms > 0) {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = number("RELAY_STABLE_THRESHOLD").filter(|n| *n > 0) {
            self.stable_threshold = u32::try_from(n).unwrap_or(u32::MAX);
        }
        if let Some(secs) = number("RELAY_CAPTURE_TIMEOUT_SECS").filter(|s| *s > 0) {
            self.capture_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = number("RELAY_DISPATCH_ATTEMPTS").filter(|n| *n > 0) {
            self.max_dispatch_attempts = u32::try_from(n).unwrap_or(u32::MAX);
        }
        if let Some(ms) = number("RELAY_RETRY_DELAY_MS") {
            self.retry_delay = Duration::from_millis(ms);
        }
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the stability threshold.
    pub fn with_stable_threshold(mut self, threshold: u32) -> Self {
        self.stable_threshold = threshold;
        self
    }

    /// Sets the capture ceiling.
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// Sets the number of delivery attempts.
    pub fn with_max_dispatch_attempts(mut self, attempts: u32) -> Self {
        self.max_dispatch_attempts = attempts;
        self
    }

    /// Sets the delay between delivery attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();

        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.stable_threshold, 4);
        assert_eq!(config.capture_timeout, Duration::from_secs(600));
        assert_eq!(config.max_dispatch_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_config_builder() {
        let config = RuntimeConfig::new()
            .with_poll_interval(Duration::from_millis(100))
            .with_stable_threshold(2)
            .with_capture_timeout(Duration::from_secs(5))
            .with_max_dispatch_attempts(5)
            .with_retry_delay(Duration::from_millis(10));

        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.stable_threshold, 2);
        assert_eq!(config.capture_timeout, Duration::from_secs(5));
        assert_eq!(config.max_dispatch_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RELAY_POLL_INTERVAL_MS", "250"),
            ("RELAY_STABLE_THRESHOLD", "6"),
            ("RELAY_DISPATCH_ATTEMPTS", "not-a-number"),
            ("RELAY_CAPTURE_TIMEOUT_SECS", "0"),
        ]
        .into_iter()
        .collect();

        let config =
            RuntimeConfig::default().with_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.stable_threshold, 6);
        assert_eq!(config.max_dispatch_attempts, 3);
        assert_eq!(config.capture_timeout, Duration::from_secs(600));
    }
}
