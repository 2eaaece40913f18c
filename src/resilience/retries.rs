//! Retry loop for fallible startup operations.
//!
//! # Responsibilities
//! - Run an operation until it succeeds or the attempt budget is spent
//! - Pause between attempts according to a [`WaitStrategy`]
//! - Optionally bound the whole loop by a deadline
//!
//! # Design Decisions
//! - Attempts are strictly sequential; at most one is in flight
//! - Only the last error is kept; earlier failures are logged at debug level
//! - No pause after the final attempt
//! - A deadline drops the in-flight attempt future, cancelling it
//! - A bad attempt budget is a distinct error from running out of attempts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};

use crate::observability::metrics;
use crate::resilience::backoff::WaitStrategy;

/// The attempt budget was below one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid retry configuration: max attempts must be at least 1, got {max_attempts}")]
pub struct InvalidConfiguration {
    pub max_attempts: i64,
}

/// Failure of a retried operation.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The policy could not be built; the operation never ran.
    #[error(transparent)]
    InvalidConfiguration(#[from] InvalidConfiguration),

    /// Every attempt failed, or the deadline hit after at least one failure.
    #[error("gave up after {attempts} attempt(s): {last_error}")]
    Exhausted {
        attempts: u32,
        #[source]
        last_error: E,
    },

    /// The deadline hit before any attempt finished.
    #[error("deadline of {deadline:?} elapsed after {attempts} attempt(s) without a result")]
    DeadlineElapsed { attempts: u32, deadline: Duration },
}

impl<E> RetryError<E> {
    /// Number of attempts started before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::InvalidConfiguration(_) => 0,
            RetryError::Exhausted { attempts, .. } | RetryError::DeadlineElapsed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { last_error, .. } => Some(last_error),
            _ => None,
        }
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, RetryError::InvalidConfiguration(_))
    }
}

/// Attempt budget, wait strategy and optional deadline for one retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    wait: WaitStrategy,
    deadline: Option<Duration>,
}

impl RetryPolicy {
    /// Build a policy. `max_attempts` below one is rejected.
    pub fn new(max_attempts: i64, wait: WaitStrategy) -> Result<Self, InvalidConfiguration> {
        let max_attempts = u32::try_from(max_attempts)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(InvalidConfiguration { max_attempts })?;

        Ok(Self {
            max_attempts,
            wait,
            deadline: None,
        })
    }

    /// Stop retrying once `deadline` has elapsed since the loop started.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn wait(&self) -> WaitStrategy {
        self.wait
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Run `op` until it succeeds or the budget is spent.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let deadline_at = self.deadline.map(|d| Instant::now() + d);
        let mut last_error = None;
        let mut attempts = 0;

        loop {
            attempts += 1;

            let Some(outcome) = within(deadline_at, op()).await else {
                tracing::debug!(operation, attempt = attempts, "Deadline reached during attempt");
                break;
            };

            match outcome {
                Ok(value) => {
                    metrics::record_retry_attempt(operation, true);
                    return Ok(value);
                }
                Err(err) => {
                    metrics::record_retry_attempt(operation, false);
                    tracing::debug!(
                        operation,
                        attempt = attempts,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Attempt failed"
                    );
                    last_error = Some(err);
                }
            }

            if attempts >= self.max_attempts {
                break;
            }

            let delay = self.wait.delay(attempts);
            if within(deadline_at, time::sleep(delay)).await.is_none() {
                tracing::debug!(operation, attempt = attempts, "Deadline reached while waiting");
                break;
            }
        }

        match last_error {
            Some(last_error) => Err(RetryError::Exhausted {
                attempts,
                last_error,
            }),
            None => Err(RetryError::DeadlineElapsed {
                attempts,
                deadline: self.deadline.unwrap_or_default(),
            }),
        }
    }
}

/// Build a policy and run `op` under it in one call.
pub async fn retry<T, E, F, Fut>(
    max_attempts: i64,
    wait: WaitStrategy,
    operation: &str,
    op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let policy = RetryPolicy::new(max_attempts, wait)?;
    policy.run(operation, op).await
}

async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(at) => time::timeout_at(at, fut).await.ok(),
        None => Some(fut.await),
    }
}
