//! Generic retry executor for operations against an unreliable remote.
//!
//! The executor retries an async operation according to a [`RetryConfig`]
//! (attempt cap, backoff curve, optional overall time budget) and a
//! [`RetryPolicy`] that classifies each failure as retryable or fatal.
//! Backoff sleeps are cooperative: a caller-supplied cancellation token
//! aborts the sequence between attempts and during sleeps.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors produced by the retry executor.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// All attempts failed; carries the last observed error so callers can
    /// translate it without re-classifying.
    #[error("all {attempts} attempts exhausted: {source}")]
    AttemptsExhausted { attempts: u32, source: E },

    /// The operation failed with an error the policy refuses to retry.
    #[error("non-retryable failure: {source}")]
    NonRetryable { source: E },

    /// The caller cancelled the operation between attempts or during a
    /// backoff sleep.
    #[error("retry sequence cancelled")]
    Cancelled,

    /// The overall time budget elapsed before the operation succeeded.
    #[error("retry budget exceeded after {elapsed:?}")]
    BudgetExceeded { elapsed: Duration },

    /// The retry configuration is invalid.
    #[error("invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Result type for retry operations.
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Classifies failures on behalf of the executor.
pub trait RetryPolicy<E> {
    /// Decide whether the error observed on the given (0-based) attempt
    /// should be retried.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for a single failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the configured backoff delay.
    Retry,
    /// Retry after a custom delay.
    RetryAfter(Duration),
    /// Give up immediately.
    Stop,
}

/// Backoff curve for the delay between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay between all retries.
    Fixed(Duration),
    /// `initial_delay + attempt * increment`; strictly increasing when the
    /// increment is non-zero.
    Linear { initial_delay: Duration, increment: Duration },
    /// `initial_delay * base^attempt`, capped at `max_delay`.
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay to sleep after the given (0-based) failed attempt.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Linear { initial_delay, increment } => {
                *initial_delay + increment.saturating_mul(attempt)
            }
            BackoffStrategy::Exponential { initial_delay, base, max_delay } => {
                let delay = initial_delay.as_millis() as f64 * base.powi(attempt as i32);
                let delay_ms = delay.min(max_delay.as_millis() as f64) as u64;
                Duration::from_millis(delay_ms)
            }
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempt cap, including the first try.
    pub max_attempts: u32,
    /// Backoff curve between attempts.
    pub backoff: BackoffStrategy,
    /// Optional cap on the whole retry sequence.
    pub max_total_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(100),
                base: 2.0,
                max_delay: Duration::from_secs(30),
            },
            max_total_time: None,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        if self.max_attempts == 0 {
            return Err(RetryError::InvalidConfiguration {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        if let BackoffStrategy::Exponential { base, .. } = &self.backoff {
            if *base <= 0.0 {
                return Err(RetryError::InvalidConfiguration {
                    message: "exponential base must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Builder for [`RetryConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    /// Total attempt cap, including the first try.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn linear_backoff(mut self, initial_delay: Duration, increment: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Linear { initial_delay, increment };
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, base, max_delay };
        self
    }

    pub fn max_total_time(mut self, duration: Duration) -> Self {
        self.config.max_total_time = Some(duration);
        self
    }

    pub fn build(self) -> Result<RetryConfig, RetryError<()>> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The retry executor: a config plus a failure-classification policy.
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Create a new executor with the given configuration and policy.
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Execute an operation with retry logic, without cancellation.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let never = CancellationToken::new();
        self.execute_cancellable(&never, operation).await
    }

    /// Execute an operation with retry logic, aborting as soon as the
    /// token is cancelled between attempts or during a backoff sleep.
    pub async fn execute_cancellable<F, Fut, T, E>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                debug!(attempt, "retry sequence cancelled before attempt");
                return Err(RetryError::Cancelled);
            }

            if let Some(budget) = self.config.max_total_time {
                let elapsed = start.elapsed();
                if elapsed >= budget {
                    warn!(?elapsed, attempt, "retry budget exceeded");
                    return Err(RetryError::BudgetExceeded { elapsed });
                }
            }

            debug!(attempt = attempt + 1, max_attempts = self.config.max_attempts, "executing operation");

            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    // the final failure is classified too; fault-observing
                    // policies see every attempt
                    let delay = match self.policy.should_retry(&error, attempt) {
                        RetryDecision::Stop => {
                            debug!(?error, "failure classified as non-retryable");
                            return Err(RetryError::NonRetryable { source: error });
                        }
                        RetryDecision::Retry => self.config.backoff.calculate_delay(attempt),
                        RetryDecision::RetryAfter(custom) => custom,
                    };

                    if attempt + 1 >= self.config.max_attempts {
                        warn!(attempts = attempt + 1, ?error, "all retry attempts exhausted");
                        return Err(RetryError::AttemptsExhausted {
                            attempts: attempt + 1,
                            source: error,
                        });
                    }

                    warn!(attempt = attempt + 1, ?delay, ?error, "operation failed, backing off");

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }

                    attempt += 1;
                }
            }
        }
    }
}

/// Pre-defined retry policies for tests and simple call sites.
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Retries on any error.
    #[derive(Debug, Clone)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retries.
    #[derive(Debug, Clone)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }
}
