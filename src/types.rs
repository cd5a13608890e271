//! Minimal domain types for preview environment provisioning.
//!
//! These are the types the deployer needs. Provider wire shapes live in
//! [`crate::resource`].

use crate::error::DeployError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default CPU cores requested per container.
pub const DEFAULT_CPU: f64 = 0.5;
/// Default memory (GB) requested per container.
pub const DEFAULT_MEMORY_GB: f64 = 0.5;

/// One deployable service from the environment descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique within an environment.
    pub name: String,
    /// Image reference. Empty means build-only: the service is skipped.
    pub image: String,
    /// Exposed container ports, in declaration order.
    pub ports: Vec<u16>,
    pub environment: HashMap<String, String>,
    pub cpu: f64,
    pub memory_gb: f64,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Vec::new(),
            environment: HashMap::new(),
            cpu: DEFAULT_CPU,
            memory_gb: DEFAULT_MEMORY_GB,
        }
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.ports = ports.into_iter().collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_resources(mut self, cpu: f64, memory_gb: f64) -> Self {
        self.cpu = cpu;
        self.memory_gb = memory_gb;
        self
    }

    /// Build-only services have no image and are never deployed.
    pub fn is_deployable(&self) -> bool {
        !self.image.trim().is_empty()
    }

    /// Requested CPU, with zero meaning "use the default".
    pub fn effective_cpu(&self) -> f64 {
        if self.cpu == 0.0 {
            DEFAULT_CPU
        } else {
            self.cpu
        }
    }

    /// Requested memory, with zero meaning "use the default".
    pub fn effective_memory_gb(&self) -> f64 {
        if self.memory_gb == 0.0 {
            DEFAULT_MEMORY_GB
        } else {
            self.memory_gb
        }
    }

    fn validate(&self) -> Result<(), DeployError> {
        if self.name.trim().is_empty() {
            return Err(DeployError::Validation("service name is empty".into()));
        }
        if self.ports.contains(&0) {
            return Err(DeployError::Validation(format!(
                "service {} declares port 0 (ports must be 1-65535)",
                self.name
            )));
        }
        if !self.cpu.is_finite() || self.cpu < 0.0 {
            return Err(DeployError::Validation(format!(
                "service {} has invalid cpu {}",
                self.name, self.cpu
            )));
        }
        if !self.memory_gb.is_finite() || self.memory_gb < 0.0 {
            return Err(DeployError::Validation(format!(
                "service {} has invalid memory {}GB",
                self.name, self.memory_gb
            )));
        }
        Ok(())
    }
}

/// Everything needed to provision one preview environment.
///
/// Built fresh for every deployment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub resource_group: String,
    pub application_name: String,
    pub location: String,
    pub services: Vec<ServiceSpec>,
    /// Public DNS label (container-group platform).
    pub dns_label: Option<String>,
    /// Shared hosting environment name (managed-application platform).
    pub environment_name: Option<String>,
}

impl EnvironmentSpec {
    pub fn new(
        resource_group: impl Into<String>,
        application_name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            application_name: application_name.into(),
            location: location.into(),
            services: Vec::new(),
            dns_label: None,
            environment_name: None,
        }
    }

    pub fn with_services(mut self, services: Vec<ServiceSpec>) -> Self {
        self.services = services;
        self
    }

    pub fn with_service(mut self, service: ServiceSpec) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_dns_label(mut self, label: impl Into<String>) -> Self {
        self.dns_label = Some(label.into());
        self
    }

    pub fn with_environment_name(mut self, name: impl Into<String>) -> Self {
        self.environment_name = Some(name.into());
        self
    }

    /// Hosting environment name, defaulting to `<application>-env`.
    pub fn hosting_environment_name(&self) -> String {
        match &self.environment_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{}-env", self.application_name),
        }
    }

    /// Services that will actually be deployed, in declaration order.
    pub fn deployable_services(&self) -> impl Iterator<Item = &ServiceSpec> {
        self.services.iter().filter(|s| s.is_deployable())
    }

    /// This environment restricted to deployable services.
    ///
    /// Fails fast when nothing is left, before any cloud call.
    pub fn deployable(&self) -> Result<EnvironmentSpec, DeployError> {
        let services: Vec<ServiceSpec> = self.deployable_services().cloned().collect();
        if services.is_empty() {
            return Err(DeployError::NoDeployableServices);
        }
        Ok(EnvironmentSpec {
            services,
            ..self.clone()
        })
    }

    /// Structural checks that need no provider round-trip.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.resource_group.is_empty() {
            return Err(DeployError::Validation("resource group name is empty".into()));
        }
        if self.application_name.is_empty() {
            return Err(DeployError::Validation("application name is empty".into()));
        }
        if self.location.is_empty() {
            return Err(DeployError::Validation("location is empty".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for service in &self.services {
            service.validate()?;
            if !seen.insert(service.name.as_str()) {
                return Err(DeployError::Validation(format!(
                    "duplicate service name: {}",
                    service.name
                )));
            }
        }
        Ok(())
    }
}

/// Produced only when a deployment fully succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    /// Fully qualified domain name of the public endpoint.
    pub public_endpoint: String,
    pub resource_group: String,
}

impl DeploymentResult {
    pub fn url(&self) -> String {
        format!("http://{}", self.public_endpoint)
    }
}

/// Handle returned by a provider create/delete call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// The provider finished synchronously.
    Done,
    /// Must be polled until it reaches a terminal state.
    Pending(PendingOperation),
}

/// An in-flight long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub status_url: String,
    pub tracking: Tracking,
}

/// How an in-flight operation reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tracking {
    /// Status document with a `status` field (`Azure-AsyncOperation`).
    StatusDocument,
    /// 202 while running, 200/204 once done (`Location`).
    Location,
}

/// Result of polling an in-flight operation once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    Running,
    Succeeded,
    Failed(ProviderFault),
}

/// Error reported by the provider for a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFault {
    pub code: String,
    pub message: String,
}

impl From<ProviderFault> for DeployError {
    fn from(fault: ProviderFault) -> Self {
        DeployError::Provider {
            code: fault.code,
            message: fault.message,
        }
    }
}

/// Service name and ports, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub ports: Vec<u16>,
}

impl From<&ServiceSpec> for ServiceSummary {
    fn from(service: &ServiceSpec) -> Self {
        Self {
            name: service.name.clone(),
            ports: service.ports.clone(),
        }
    }
}
