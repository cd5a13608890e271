//! Hosting platform variants.
//!
//! Both variants share one deploy sequence (ensure, submit, poll, extract
//! endpoint). Which one runs is a configuration choice.

use crate::error::DeployError;
use crate::retry::RetryBudgets;
use crate::types::EnvironmentSpec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformKind {
    /// All services in one container group with a public IP and DNS label.
    ContainerGroup,
    /// One container app inside a shared managed environment, with a single
    /// public ingress that scales to zero.
    #[default]
    ManagedApplication,
}

impl PlatformKind {
    pub fn name(&self) -> &'static str {
        match self {
            PlatformKind::ContainerGroup => "container-group",
            PlatformKind::ManagedApplication => "managed-application",
        }
    }

    /// Whether a shared hosting environment must exist before the application.
    pub fn has_hosting_environment(&self) -> bool {
        matches!(self, PlatformKind::ManagedApplication)
    }

    /// Retry budget for submitting the application resource.
    pub fn submit_budget(&self, budgets: &RetryBudgets) -> Duration {
        match self {
            PlatformKind::ContainerGroup => budgets.short,
            PlatformKind::ManagedApplication => budgets.long,
        }
    }

    /// Platform-specific checks, run before any cloud call.
    pub fn validate(&self, spec: &EnvironmentSpec) -> Result<(), DeployError> {
        match self {
            PlatformKind::ContainerGroup => {
                if spec.dns_label.as_deref().map_or(true, str::is_empty) {
                    return Err(DeployError::Validation(
                        "container group requires a DNS label".into(),
                    ));
                }
                if spec.deployable_services().all(|s| s.ports.is_empty()) {
                    return Err(DeployError::Validation(
                        "container group requires at least one exposed port".into(),
                    ));
                }
                Ok(())
            }
            PlatformKind::ManagedApplication => Ok(()),
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlatformKind {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container-group" | "aci" => Ok(PlatformKind::ContainerGroup),
            "managed-application" | "aca" => Ok(PlatformKind::ManagedApplication),
            other => Err(DeployError::Config(format!(
                "unknown platform {other:?} (expected container-group or managed-application)"
            ))),
        }
    }
}
