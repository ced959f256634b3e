//! Retry logic with exponential backoff
//!
//! Remote calls are retried only when the failure happened below the HTTP
//! layer (connection refused, reset, timeout). A service that answered with
//! an error status, or with a body that does not parse, is not retried: the
//! same request would get the same answer.
//!
//! # Example
//!
//! ```no_run
//! use qbo_sync::retry::{IsRetryable, with_retry};
//! use qbo_sync::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, RemoteFailure};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for RemoteFailure {
    fn is_retryable(&self) -> bool {
        self.is_transport()
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Remote(failure) => failure.is_retryable(),
            _ => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// `config.max_attempts` bounds the total number of calls, the first one
/// included. Returns the successful result or the last error.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    with_retry_counted(config, operation).await.0
}
/// Like [`with_retry`], also returning how many calls were made
pub async fn with_retry_counted<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> (Result<T, E>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let budget = config.max_attempts.max(1);
    let mut wait = config.initial_delay;
    let mut calls = 0u32;

    loop {
        calls += 1;
        let error = match operation().await {
            Ok(value) => {
                if calls > 1 {
                    tracing::info!(calls, "remote call recovered");
                }
                return (Ok(value), calls);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            tracing::debug!(error = %error, "not retrying");
            return (Err(error), calls);
        }
        if calls >= budget {
            tracing::warn!(error = %error, calls, "giving up after transport failures");
            return (Err(error), calls);
        }

        let pause = if config.jitter { add_jitter(wait) } else { wait };
        tracing::warn!(
            error = %error,
            call = calls,
            budget,
            pause_ms = pause.as_millis() as u64,
            "transport failure, retrying"
        );
        tokio::time::sleep(pause).await;
        wait = next_delay(config, wait);
    }
}

/// Grow `current` by the backoff multiplier, capped at `max_delay`
///
/// A product that does not fit in a `Duration` (or a NaN multiplier) lands
/// on the cap.
fn next_delay(config: &RetryConfig, current: Duration) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * config.backoff_multiplier.max(1.0))
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Stretch `delay` by a random factor in `[1, 2]`
fn add_jitter(delay: Duration) -> Duration {
    let factor = 1.0 + rand::thread_rng().gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
}
