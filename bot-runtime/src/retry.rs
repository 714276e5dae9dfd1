//! Connect with bounded attempts, per-attempt timeout and exponential backoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::transport::{Connection, TransportConnector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total connect attempts, first one included.
    pub max_attempts: usize,
    /// Delay before the second attempt; doubles after each failure.
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound for a single connect attempt.
    pub connect_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delays between attempts: `base, 2*base, 4*base, ...` capped at `max_backoff`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let factor = (self.base_backoff.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_backoff)
            .take(self.max_attempts.saturating_sub(1))
    }
}

/// Connects through `connector`, retrying timeouts only. Rejections and other errors abort at once.
pub async fn connect_with_retry(
    connector: &dyn TransportConnector,
    credential: &str,
    policy: &RetryPolicy,
    bot_name: &str,
) -> Result<Box<dyn Connection>, TransportError> {
    let attempts = AtomicUsize::new(0);
    let attempts = &attempts;
    let timeout = policy.connect_timeout;

    let result = RetryIf::spawn(
        policy.delays(),
        move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let outcome = match tokio::time::timeout(timeout, connector.connect(credential)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(TransportError::Timeout(timeout)),
            };
            if let Err(e) = &outcome {
                warn!(bot = %bot_name, attempt, error = %e, "Connect attempt failed");
            }
            outcome
        },
        |e: &TransportError| e.is_transient(),
    )
    .await;

    if result.is_ok() {
        info!(
            bot = %bot_name,
            attempts = attempts.load(Ordering::SeqCst),
            "Connected"
        );
    }
    result
}
