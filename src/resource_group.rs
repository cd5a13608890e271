//! Resource group lifecycle: the unit of deployment and of cleanup.

use std::time::Duration;

use crate::backend::CloudBackend;
use crate::error::DeployError;
use crate::lro::wait_for;
use crate::observer::DeployObserver;
use crate::retry::RetryPolicy;

pub struct ResourceGroups<'a, B: CloudBackend> {
    backend: &'a B,
    observer: &'a dyn DeployObserver,
    poll_interval: Duration,
}

impl<'a, B: CloudBackend> ResourceGroups<'a, B> {
    pub fn new(backend: &'a B, observer: &'a dyn DeployObserver, poll_interval: Duration) -> Self {
        Self {
            backend,
            observer,
            poll_interval,
        }
    }

    /// Create the group if missing, update it in place otherwise.
    pub async fn ensure(
        &self,
        name: &str,
        location: &str,
        policy: &RetryPolicy,
    ) -> Result<(), DeployError> {
        let backend = self.backend;
        policy
            .run("ensure resource group", self.observer, move || async move {
                backend.create_or_update_resource_group(name, location).await
            })
            .await?;
        tracing::debug!(resource_group = name, location, "resource group ready");
        Ok(())
    }

    /// Delete the group and wait for the deletion to finish.
    ///
    /// The begin call and the wait are retried together: a delete that was
    /// accepted but then failed is simply issued again.
    pub async fn delete(&self, name: &str, policy: &RetryPolicy) -> Result<(), DeployError> {
        let backend = self.backend;
        let interval = self.poll_interval;
        policy
            .run("delete resource group", self.observer, move || async move {
                let operation = backend.begin_delete_resource_group(name).await?;
                wait_for(backend, operation, interval).await
            })
            .await?;
        tracing::debug!(resource_group = name, "resource group deleted");
        Ok(())
    }
}
