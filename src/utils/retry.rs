use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Exponential Backoff Retry for Transient Failures
// ============================================================================
//
// Used to re-run a whole read-decide-write cycle after losing a version race.
// Errors that are not transient are returned on the first occurrence.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(50),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::from_secs_f64(delay.as_secs_f64() * self.multiplier).min(self.max_delay)
    }
}

/// Check if an error is transient (should retry) or permanent (should not retry)
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Failure after retrying, with the number of attempts made
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub error: E,
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// attempts. The closure receives the 1-based attempt number.
pub async fn retry_on_transient<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_transient() || attempt >= config.max_attempts {
            if error.is_transient() {
                tracing::warn!(attempt = attempt, error = %error, "Retries exhausted");
            }
            return Err(RetryExhausted {
                attempts: attempt,
                error,
            });
        }

        tracing::debug!(
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "Transient failure, retrying after delay"
        );
        sleep(delay).await;
        delay = config.next_delay(delay);
    }
}
