//! Bounded exponential backoff around provider calls.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::DeployError;
use crate::observer::{DeployEvent, DeployObserver};

/// Retry budgets per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudgets {
    /// Resource group and container-instance operations.
    pub short: Duration,
    /// Teardown operations.
    pub medium: Duration,
    /// Managed-application environment and app creation; provisioning
    /// routinely takes several minutes.
    pub long: Duration,
}

impl Default for RetryBudgets {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(2 * 60),
            medium: Duration::from_secs(5 * 60),
            long: Duration::from_secs(10 * 60),
        }
    }
}

/// Shape of the backoff curve, shared by every budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffShape {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Jitter: each delay is drawn from `interval * (1 ± factor)`.
    pub randomization_factor: f64,
}

impl Default for BackoffShape {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(60),
            multiplier: 1.5,
            randomization_factor: 0.5,
        }
    }
}

/// Retries transient failures until `budget` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub shape: BackoffShape,
    pub budget: Duration,
}

impl RetryPolicy {
    pub fn new(shape: BackoffShape, budget: Duration) -> Self {
        Self { shape, budget }
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self::new(BackoffShape::default(), budget)
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `op` may run more than once, so it must be idempotent from the
    /// caller's point of view (create-or-update, delete). The budget is
    /// measured on the tokio clock and checked before each retry, so a
    /// retry is only scheduled if its delay still fits.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        observer: &dyn DeployObserver,
        mut op: F,
    ) -> Result<T, DeployError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DeployError>>,
    {
        let started = Instant::now();
        let mut backoff = self.backoff();
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if error.is_permanent() {
                observer.on_event(&DeployEvent::PermanentFailure {
                    operation: operation.to_string(),
                    error: error.to_string(),
                });
                return Err(error);
            }

            let next = backoff
                .next_backoff()
                .filter(|delay| started.elapsed() + *delay <= self.budget);
            match next {
                Some(delay) => {
                    observer.on_event(&DeployEvent::RetryScheduled {
                        operation: operation.to_string(),
                        attempt: attempts,
                        delay,
                        error: error.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(DeployError::RetryExhausted {
                        operation: operation.to_string(),
                        attempts,
                        budget: self.budget,
                        last: Box::new(error),
                    });
                }
            }
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.shape.initial_interval)
            .with_max_interval(self.shape.max_interval)
            .with_multiplier(self.shape.multiplier)
            .with_randomization_factor(self.shape.randomization_factor)
            .with_max_elapsed_time(None)
            .build();
        backoff.reset();
        backoff
    }
}
