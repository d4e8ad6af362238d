//! Async utilities and patterns
//!
//! Retry logic with exponential backoff, rate limiting, and bounded concurrency

use crate::error::{ErrorContext, LitError, LitResult};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: usize,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier (exponential backoff)
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// Non-recoverable errors are returned immediately; recoverable ones are
/// retried until the attempt budget is exhausted. When the error carries its
/// own retry delay (rate limits), it overrides the computed backoff.
pub async fn retry_async<F, T>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> LitResult<T>
where
    F: Fn() -> BoxFuture<'static, LitResult<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        debug!(
            operation = operation_name,
            attempt = attempt,
            max_attempts = config.max_attempts,
            "Attempting operation"
        );

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_recoverable() || attempt >= config.max_attempts {
                    if error.is_recoverable() {
                        warn!(
                            operation = operation_name,
                            attempt = attempt,
                            error = %error,
                            "Operation failed after all retry attempts"
                        );
                    }
                    return Err(error);
                }

                let next_delay = error.retry_delay_ms().unwrap_or(delay).max(delay);

                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %error,
                    delay_ms = next_delay,
                    "Operation failed, retrying"
                );

                let actual_delay = if config.jitter {
                    let jitter_factor = 0.1;
                    let jitter = (fastrand::f64() - 0.5) * 2.0 * jitter_factor;
                    ((next_delay as f64) * (1.0 + jitter)) as u64
                } else {
                    next_delay
                };

                sleep(Duration::from_millis(actual_delay)).await;

                delay = ((delay as f64) * config.backoff_multiplier) as u64;
                delay = delay.min(config.max_delay_ms);
            }
        }
    }
}

/// Concurrent processing with controlled parallelism
pub async fn process_concurrently<T, R, F, Fut>(
    items: Vec<T>,
    max_concurrent: usize,
    processor: F,
) -> Vec<LitResult<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: std::future::Future<Output = LitResult<R>> + Send + 'static,
{
    use futures::stream::{self, StreamExt};

    stream::iter(items)
        .map(|item| {
            let processor = processor.clone();
            tokio::spawn(async move { processor(item).await })
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|join_result| match join_result {
            Ok(result) => result,
            Err(join_error) => Err(LitError::Internal {
                message: format!("Task join error: {}", join_error),
                source: Some(Box::new(join_error)),
                context: ErrorContext::new("async_utils")
                    .with_operation("process_concurrently")
                    .with_suggestion("Check for panics in concurrent tasks"),
            }),
        })
        .collect()
}

/// Rate limiter for API calls
#[derive(Debug)]
pub struct RateLimiter {
    permits: Arc<tokio::sync::Semaphore>,
    min_interval: Duration,
    last_request: Arc<tokio::sync::Mutex<Option<tokio::time::Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_concurrent: usize, min_interval_ms: u64) -> Self {
        Self {
            permits: Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1))),
            min_interval: Duration::from_millis(min_interval_ms),
            last_request: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Acquire a permit and enforce the minimum request interval
    pub async fn acquire(&self) -> LitResult<RateLimitGuard> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| LitError::Internal {
                message: format!("Failed to acquire rate limit permit: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("rate_limiter").with_operation("acquire"),
            })?;

        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let sleep_duration = self.min_interval - elapsed;
                debug!(
                    sleep_ms = sleep_duration.as_millis(),
                    "Rate limiting: sleeping to enforce minimum interval"
                );
                sleep(sleep_duration).await;
            }
        }
        *last_request = Some(tokio::time::Instant::now());

        Ok(RateLimitGuard { _permit: permit })
    }
}

/// RAII guard for rate limiter permits
pub struct RateLimitGuard {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
