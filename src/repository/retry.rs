use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff.as_secs_f64());

        let final_duration = if self.jitter {
            // 0-25%
            capped * (1.0 + rand_jitter() * 0.25)
        } else {
            capped
        };

        Duration::from_secs_f64(final_duration)
    }
}

fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    /// Retry after a server-provided delay (Retry-After).
    RetryAfter(Duration),
    NoRetry,
}

pub trait RetryableError {
    fn retry_decision(&self) -> RetryDecision;
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// retries. Returns the last error in the latter two cases.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let decision = err.retry_decision();
        if decision == RetryDecision::NoRetry {
            debug!(
                operation = operation_name,
                attempt,
                error = %err,
                "operation failed with non-retryable error"
            );
            return Err(err);
        }

        if attempt >= config.max_retries {
            warn!(
                operation = operation_name,
                attempts = attempt + 1,
                error = %err,
                "operation failed after all retries"
            );
            return Err(err);
        }

        let backoff = match decision {
            RetryDecision::RetryAfter(d) => d.min(config.max_backoff),
            _ => config.backoff_duration(attempt),
        };

        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            max_attempts = config.max_retries + 1,
            backoff_secs = backoff.as_secs_f64(),
            error = %err,
            "retrying after error"
        );

        sleep(backoff).await;
        attempt += 1;
    }
}
