//! Rate-limit retry for chain RPC calls
//!
//! Public Polygon nodes answer bursts with "Too many requests". Only that
//! error is retried; anything else propagates on the first attempt.

use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Injectable sleep so backoff and polling can be observed in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcRetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait before retry `n` (1-based) is `base_delay * n`
    pub base_delay: Duration,
}

impl Default for RpcRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
        }
    }
}

impl RpcRetryPolicy {
    /// Run `f`, sleeping `base_delay * (attempt + 1)` after each rate-limited
    /// failure while attempts remain.
    pub async fn run<T, F, Fut>(&self, sleeper: &dyn Sleeper, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_rate_limited() && attempt + 1 < self.max_attempts => {
                    let wait = self.base_delay * (attempt + 1);
                    warn!(
                        "[Retry] {} rate limited, waiting {}s (attempt {}/{})",
                        operation,
                        wait.as_secs(),
                        attempt + 1,
                        self.max_attempts
                    );
                    sleeper.sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!("[Retry] {} failed after {} attempts: {}", operation, attempt + 1, err);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records requested sleeps without waiting
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn recorded(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn rate_limited() -> Error {
        Error::Rpc("429 Too many requests".to_string())
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let sleeper = RecordingSleeper::default();
        let result = RpcRetryPolicy::default()
            .run(&sleeper, "test", || async { Ok::<_, Error>(42) })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_backoff_then_success() {
        let sleeper = RecordingSleeper::default();
        let counter = AtomicU32::new(0);

        let result = RpcRetryPolicy::default()
            .run(&sleeper, "eth_gasPrice", || {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(rate_limited())
                    } else {
                        Ok(7u64)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_secs(10), Duration::from_secs(20)]
        );
    }

    #[tokio::test]
    async fn test_budget_exhausted_propagates() {
        let sleeper = RecordingSleeper::default();
        let counter = AtomicU32::new(0);

        let result = RpcRetryPolicy::default()
            .run(&sleeper, "eth_call", || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u64, _>(rate_limited()) }
            })
            .await;

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_secs(10), Duration::from_secs(20)]
        );
    }

    #[tokio::test]
    async fn test_other_errors_fail_immediately() {
        let sleeper = RecordingSleeper::default();
        let counter = AtomicU32::new(0);

        let result = RpcRetryPolicy::default()
            .run(&sleeper, "eth_estimateGas", || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u64, _>(Error::Rpc("execution reverted".to_string())) }
            })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "RPC error: execution reverted");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().is_empty());
    }
}
