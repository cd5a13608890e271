//! Deployer
//!
//! Sequences one preview deployment: resource group, hosting environment
//! (managed-application platform only), application submission, polling and
//! endpoint extraction. Any failure once the group exists deletes the group.
//! Teardown deletes the group.

use std::future::Future;
use std::time::Duration;

use crate::backend::CloudBackend;
use crate::error::DeployError;
use crate::lro::wait_for;
use crate::observer::{DeployEvent, DeployObserver};
use crate::platform::PlatformKind;
use crate::resource::ManagedEnvironment;
use crate::resource_group::ResourceGroups;
use crate::retry::{BackoffShape, RetryBudgets, RetryPolicy};
use crate::state::DeployPhase;
use crate::translate::translate;
use crate::types::{DeploymentResult, EnvironmentSpec};

/// Deployer configuration.
#[derive(Debug, Clone)]
pub struct DeployerConfig {
    pub platform: PlatformKind,
    pub budgets: RetryBudgets,
    /// Budget for deleting the group after a failed deploy. Independent of
    /// whatever budget the failing step had.
    pub cleanup_budget: Duration,
    /// Delay between polls of a long-running operation.
    pub poll_interval: Duration,
    pub backoff: BackoffShape,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            platform: PlatformKind::default(),
            budgets: RetryBudgets::default(),
            cleanup_budget: Duration::from_secs(2 * 60),
            poll_interval: Duration::from_secs(5),
            backoff: BackoffShape::default(),
        }
    }
}

/// The deployment orchestrator.
///
/// Parameterized by the backend; holds no state between calls.
pub struct Deployer<'a, B: CloudBackend> {
    backend: &'a B,
    observer: &'a dyn DeployObserver,
    config: DeployerConfig,
}

impl<'a, B: CloudBackend> Deployer<'a, B> {
    pub fn new(backend: &'a B, observer: &'a dyn DeployObserver, config: DeployerConfig) -> Self {
        Self {
            backend,
            observer,
            config,
        }
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }

    /// Deploy `spec` and return its public endpoint.
    ///
    /// Validation happens before any provider call. A failure while ensuring
    /// the group is returned as-is; any later failure deletes the group
    /// first and then returns the failure that caused the rollback.
    pub async fn deploy(&self, spec: &EnvironmentSpec) -> Result<DeploymentResult, DeployError> {
        let spec = spec.deployable()?;
        spec.validate()?;
        self.config.platform.validate(&spec)?;

        let rg = spec.resource_group.as_str();
        let mut phase = DeployPhase::Idle;

        self.transition(&mut phase, rg, DeployPhase::GroupEnsuring);
        self.groups()
            .ensure(rg, &spec.location, &self.policy(self.config.budgets.short))
            .await?;

        let endpoint = match self.provision(&spec, &mut phase).await {
            Ok(endpoint) => endpoint,
            Err(error) if phase.requires_rollback() => {
                self.rollback(rg, &error).await;
                self.transition(&mut phase, rg, DeployPhase::RolledBack);
                return Err(error);
            }
            Err(error) => return Err(error),
        };
        self.transition(&mut phase, rg, DeployPhase::Succeeded);
        self.observer.on_event(&DeployEvent::Deployed {
            resource_group: rg.to_string(),
            endpoint: endpoint.clone(),
        });

        Ok(DeploymentResult {
            public_endpoint: endpoint,
            resource_group: rg.to_string(),
        })
    }

    /// [`deploy`](Self::deploy) under an overall deadline.
    ///
    /// Expiry abandons whatever is in flight and returns
    /// [`DeployError::Timeout`]. It does not roll back.
    pub async fn deploy_within(
        &self,
        spec: &EnvironmentSpec,
        deadline: Duration,
    ) -> Result<DeploymentResult, DeployError> {
        within(deadline, "deploy", self.deploy(spec)).await
    }

    /// Delete the resource group and everything in it.
    pub async fn delete_resource_group(&self, resource_group: &str) -> Result<(), DeployError> {
        self.groups()
            .delete(resource_group, &self.policy(self.config.budgets.medium))
            .await?;
        self.observer.on_event(&DeployEvent::TornDown {
            resource_group: resource_group.to_string(),
        });
        Ok(())
    }

    /// [`delete_resource_group`](Self::delete_resource_group) under an overall deadline.
    pub async fn teardown_within(
        &self,
        resource_group: &str,
        deadline: Duration,
    ) -> Result<(), DeployError> {
        within(deadline, "teardown", self.delete_resource_group(resource_group)).await
    }

    /// Delete only the application, leaving the group and any hosting
    /// environment in place.
    pub async fn delete_application(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), DeployError> {
        let backend = self.backend;
        let platform = self.config.platform;
        let interval = self.config.poll_interval;
        self.policy(self.config.budgets.medium)
            .run("delete application", self.observer, move || async move {
                let operation = backend
                    .begin_delete_application(resource_group, name, platform)
                    .await?;
                wait_for(backend, operation, interval).await
            })
            .await
    }

    // ═══════════════════════════════════════════════════════════════
    // STEPS
    // ═══════════════════════════════════════════════════════════════

    /// Everything after the group exists. Returns the public FQDN.
    async fn provision(
        &self,
        spec: &EnvironmentSpec,
        phase: &mut DeployPhase,
    ) -> Result<String, DeployError> {
        let rg = spec.resource_group.as_str();
        let platform = self.config.platform;

        let hosting_environment_id = if platform.has_hosting_environment() {
            self.transition(phase, rg, DeployPhase::EnvironmentEnsuring);
            Some(self.ensure_environment(spec).await?)
        } else {
            None
        };

        let description = translate(spec, platform, hosting_environment_id.as_deref());

        self.transition(phase, rg, DeployPhase::ApplicationSubmitting);
        let backend = self.backend;
        let name = spec.application_name.as_str();
        let description = &description;
        let operation = self
            .policy(platform.submit_budget(&self.config.budgets))
            .run("submit application", self.observer, move || async move {
                backend
                    .begin_create_or_update_application(rg, name, description)
                    .await
            })
            .await?;

        self.transition(phase, rg, DeployPhase::ApplicationPolling);
        wait_for(backend, operation, self.config.poll_interval).await?;

        let provisioned = self
            .policy(self.config.budgets.short)
            .run("read application", self.observer, move || async move {
                backend.get_application(rg, name, platform).await
            })
            .await?;

        provisioned.public_endpoint(name)
    }

    /// Create-or-update the shared environment and return its resource ID.
    async fn ensure_environment(&self, spec: &EnvironmentSpec) -> Result<String, DeployError> {
        let backend = self.backend;
        let interval = self.config.poll_interval;
        let rg = spec.resource_group.as_str();
        let name = spec.hosting_environment_name();
        let name = name.as_str();
        let environment = ManagedEnvironment::new(spec.location.clone());
        let environment = &environment;

        self.policy(self.config.budgets.long)
            .run("ensure hosting environment", self.observer, move || async move {
                let operation = backend
                    .begin_create_or_update_environment(rg, name, environment)
                    .await?;
                wait_for(backend, operation, interval).await?;
                backend
                    .get_environment(rg, name)
                    .await?
                    .id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| DeployError::MissingResourceId {
                        resource: format!("managed environment {name}"),
                    })
            })
            .await
    }

    /// Best-effort: a failed rollback is reported, never returned.
    ///
    /// The whole delete, polling included, is bounded by the cleanup budget.
    async fn rollback(&self, resource_group: &str, cause: &DeployError) {
        self.observer.on_event(&DeployEvent::RollbackStarted {
            resource_group: resource_group.to_string(),
            reason: cause.to_string(),
        });

        let budget = self.config.cleanup_budget;
        let policy = self.policy(budget);
        let groups = self.groups();
        let delete = groups.delete(resource_group, &policy);
        if let Err(error) = within(budget, "rollback", delete).await {
            self.observer.on_event(&DeployEvent::RollbackFailed {
                resource_group: resource_group.to_string(),
                error: error.to_string(),
            });
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════

    fn groups(&self) -> ResourceGroups<'a, B> {
        ResourceGroups::new(self.backend, self.observer, self.config.poll_interval)
    }

    fn policy(&self, budget: Duration) -> RetryPolicy {
        RetryPolicy::new(self.config.backoff, budget)
    }

    fn transition(&self, phase: &mut DeployPhase, resource_group: &str, next: DeployPhase) {
        *phase = next;
        self.observer.on_event(&DeployEvent::Phase {
            resource_group: resource_group.to_string(),
            phase: next,
        });
    }
}

async fn within<T>(
    deadline: Duration,
    what: &str,
    fut: impl Future<Output = Result<T, DeployError>>,
) -> Result<T, DeployError> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeployError::Timeout(format!("{what} did not finish within {deadline:?}")))?
}
