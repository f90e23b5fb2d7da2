/*
[INPUT]:  Consecutive connection-failure counts
[OUTPUT]: Backoff delays or the decision to give up
[POS]:    WebSocket layer - injectable reconnect policy
[UPDATE]: When the backoff schedule or exhaustion semantics change
*/

use std::time::Duration;

/// Reconnect policy for the status channel.
///
/// The failure count resets after every successful connection, so
/// `max_attempts` bounds consecutive failures, not lifetime reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Give up after this many consecutive failures; `None` retries forever
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(8),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Reconnect forever, mirroring the minimal always-reconnect behavior.
    pub fn unconditional() -> Self {
        Self {
            max_attempts: None,
            ..Self::default()
        }
    }

    /// Give up after `max_attempts` consecutive failures.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::default()
        }
    }

    /// Delay before the next attempt after `failures` consecutive failures
    /// (1-based), or `None` when the policy is exhausted.
    pub fn delay(&self, failures: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts
            && failures >= max
        {
            return None;
        }
        let exp = failures.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(exp));
        Some(delay.min(self.max_delay))
    }
}
