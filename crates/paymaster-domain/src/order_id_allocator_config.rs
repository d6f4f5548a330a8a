use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for order ID allocation.
///
/// `max_retry_attempts` counts retries after the first attempt, so the
/// allocator performs at most `1 + max_retry_attempts` counter transactions
/// per allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIdAllocatorConfig {
    /// Base delay before retrying a conflicted counter transaction
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound of the random jitter added to each retry delay
    #[serde(default = "default_retry_jitter_ms")]
    pub retry_jitter_ms: u64,

    /// Retries allowed after the first attempt
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
}

fn default_retry_delay_ms() -> u64 {
    20
}

fn default_retry_jitter_ms() -> u64 {
    30
}

fn default_max_retry_attempts() -> u32 {
    5
}

impl Default for OrderIdAllocatorConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            retry_jitter_ms: default_retry_jitter_ms(),
            max_retry_attempts: default_max_retry_attempts(),
        }
    }
}

impl OrderIdAllocatorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrderIdAllocatorConfig::default();
        assert_eq!(config.retry_delay(), Duration::from_millis(20));
        assert_eq!(config.retry_jitter_ms, 30);
        assert_eq!(config.max_retry_attempts, 5);
    }

    #[test]
    fn test_omitted_fields_take_defaults() {
        let config: OrderIdAllocatorConfig =
            serde_json::from_str(r#"{"max_retry_attempts": 64}"#).unwrap();
        assert_eq!(config.max_retry_attempts, 64);
        assert_eq!(config.retry_delay_ms, 20);
    }
}
