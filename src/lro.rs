//! Waiting on long-running provider operations.

use std::time::Duration;

use crate::backend::CloudBackend;
use crate::error::DeployError;
use crate::types::{Operation, OperationState};

/// Poll `operation` every `interval` until it reaches a terminal state.
///
/// A transient error while polling does not abandon the operation, which is
/// still in flight on the provider; the next poll happens after `interval`.
/// There is no bound here. Callers run this under an overall deadline.
pub async fn wait_for<B: CloudBackend>(
    backend: &B,
    operation: Operation,
    interval: Duration,
) -> Result<(), DeployError> {
    let pending = match operation {
        Operation::Done => return Ok(()),
        Operation::Pending(pending) => pending,
    };

    loop {
        match backend.poll_operation(&pending).await {
            Ok(OperationState::Succeeded) => return Ok(()),
            Ok(OperationState::Failed(fault)) => return Err(fault.into()),
            Ok(OperationState::Running) => {
                tracing::trace!(status_url = %pending.status_url, "operation still running");
            }
            Err(error) if error.is_transient() => {
                tracing::debug!(status_url = %pending.status_url, %error, "poll failed, polling again");
            }
            Err(error) => return Err(error),
        }
        tokio::time::sleep(interval).await;
    }
}
