//! Bounded retries for storage contention
//!
//! Only [`SpamError::Busy`] is retried. Every other error, and every success,
//! is handed back to the caller on the attempt that produced it.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

use super::progress::{Progress, ProgressEvent};
use crate::config::RetryConfig;
use crate::error::{Result, SpamError};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.interval())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `op` until it stops reporting busy or attempts run out
    pub async fn run<T, F, Fut>(&self, progress: &Progress, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;

        loop {
            match op().await {
                Err(SpamError::Busy(reason)) => {
                    if attempt >= self.max_attempts {
                        error!("Storage still busy after {} attempts: {}", attempt, reason);
                        return Err(SpamError::StorageUnavailable {
                            attempts: attempt,
                            reason,
                        });
                    }

                    warn!(
                        "Storage busy (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.max_attempts, self.interval, reason
                    );
                    progress.notify(ProgressEvent::Retry {
                        attempt,
                        limit: self.max_attempts,
                        reason,
                    });

                    sleep(self.interval).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
