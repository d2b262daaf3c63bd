use std::future::Future;
use std::time::Duration;

use crate::api::ApiError;

/// How often a request is repeated while the server reports its store as
/// unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Runs `operation`, repeating it after `delay` whenever it fails with
    /// [`ApiError::Unavailable`]. Any other outcome is returned immediately.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut retries = 0;
        loop {
            match operation().await {
                Err(err) if err.is_unavailable() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        "{} unavailable ({}), retrying in {:?} ({}/{})",
                        name,
                        err,
                        self.delay,
                        retries,
                        self.max_retries
                    );
                    tokio::time::sleep(self.delay).await;
                }
                result => return result,
            }
        }
    }
}
