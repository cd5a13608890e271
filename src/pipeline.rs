//! Pull-request level flow.
//!
//! A PR event becomes an [`EnvironmentIdentity`], then generated names, then
//! a service list from the descriptor, then a deploy or teardown under a
//! process-level deadline, then a status report. Reporting never changes
//! the outcome.

use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::backend::CloudBackend;
use crate::deployer::Deployer;
use crate::descriptor::{collect_services, DescriptorSource};
use crate::error::DeployError;
use crate::naming::{EnvironmentIdentity, EnvironmentNames};
use crate::observer::{DeployEvent, DeployObserver};
use crate::report::{DeploymentOutcome, StatusReporter};
use crate::types::{DeploymentResult, EnvironmentSpec, ServiceSummary};

/// What a pull-request event asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestAction {
    Deploy,
    Teardown,
    /// Labels, edits, review requests and the like.
    Ignore,
}

impl FromStr for PullRequestAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "opened" | "synchronize" | "reopened" => PullRequestAction::Deploy,
            "closed" => PullRequestAction::Teardown,
            _ => PullRequestAction::Ignore,
        })
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Region every resource is created in.
    pub location: String,
    pub deploy_deadline: Duration,
    pub teardown_deadline: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            location: "eastus".into(),
            deploy_deadline: Duration::from_secs(15 * 60),
            teardown_deadline: Duration::from_secs(5 * 60),
        }
    }
}

/// What [`PreviewPipeline::handle`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Deployed(DeploymentOutcome),
    TornDown { resource_group: String },
    Ignored,
}

pub struct PreviewPipeline<'a, B: CloudBackend> {
    deployer: Deployer<'a, B>,
    reporter: &'a dyn StatusReporter,
    observer: &'a dyn DeployObserver,
    settings: PipelineSettings,
}

impl<'a, B: CloudBackend> PreviewPipeline<'a, B> {
    pub fn new(
        deployer: Deployer<'a, B>,
        reporter: &'a dyn StatusReporter,
        observer: &'a dyn DeployObserver,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            deployer,
            reporter,
            observer,
            settings,
        }
    }

    /// Dispatch one PR event.
    pub async fn handle(
        &self,
        action: PullRequestAction,
        identity: &EnvironmentIdentity,
        source: &dyn DescriptorSource,
    ) -> Result<PipelineOutcome, DeployError> {
        match action {
            PullRequestAction::Deploy => {
                self.deploy(identity, source).await.map(PipelineOutcome::Deployed)
            }
            PullRequestAction::Teardown => {
                let resource_group = self.teardown(identity).await?;
                Ok(PipelineOutcome::TornDown { resource_group })
            }
            PullRequestAction::Ignore => {
                tracing::info!(pull_request = %identity, "nothing to do for this action");
                Ok(PipelineOutcome::Ignored)
            }
        }
    }

    /// Create or update the preview environment for `identity`.
    pub async fn deploy(
        &self,
        identity: &EnvironmentIdentity,
        source: &dyn DescriptorSource,
    ) -> Result<DeploymentOutcome, DeployError> {
        let started = Instant::now();
        let spec = self.environment_spec(identity, source)?;

        let DeploymentResult {
            public_endpoint,
            resource_group,
        } = self
            .deployer
            .deploy_within(&spec, self.settings.deploy_deadline)
            .await?;

        let outcome = DeploymentOutcome {
            url: format!("http://{}", public_endpoint),
            endpoint: public_endpoint,
            resource_group,
            services: spec
                .deployable_services()
                .map(ServiceSummary::from)
                .collect(),
            elapsed: started.elapsed(),
        };

        if let Err(error) = self.reporter.report_deployment(identity, &outcome).await {
            self.observer.on_event(&DeployEvent::ReportFailed {
                error: error.to_string(),
            });
        }

        Ok(outcome)
    }

    /// Delete the preview environment for `identity`. Returns the group name.
    pub async fn teardown(&self, identity: &EnvironmentIdentity) -> Result<String, DeployError> {
        let names = EnvironmentNames::derive(identity)?;

        self.deployer
            .teardown_within(&names.resource_group, self.settings.teardown_deadline)
            .await?;

        if let Err(error) = self.reporter.report_teardown(identity).await {
            self.observer.on_event(&DeployEvent::ReportFailed {
                error: error.to_string(),
            });
        }

        Ok(names.resource_group)
    }

    /// Names plus services. No provider calls.
    pub fn environment_spec(
        &self,
        identity: &EnvironmentIdentity,
        source: &dyn DescriptorSource,
    ) -> Result<EnvironmentSpec, DeployError> {
        let names = EnvironmentNames::derive(identity)?;
        if names.dns_label_shortened {
            self.observer.on_event(&DeployEvent::DnsLabelShortened {
                label: names.dns_label.clone(),
            });
        }

        let services = collect_services(source, self.observer);

        Ok(
            EnvironmentSpec::new(names.resource_group, names.application, self.settings.location.as_str())
                .with_services(services)
                .with_dns_label(names.dns_label),
        )
    }
}
