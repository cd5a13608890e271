//! Provider resource shapes, as sent to and returned by Azure Resource Manager.
//!
//! Field names follow the ARM JSON schema. Everything the provider may omit
//! is an `Option` so that a provisioned resource deserializes into the same
//! type that was submitted.

use crate::error::DeployError;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════
// SHARED
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVar {
    pub name: String,
    pub value: String,
}

/// A translated application, in the shape of the configured platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceDescription {
    ContainerGroup(ContainerGroup),
    ContainerApp(ContainerApp),
}

impl ResourceDescription {
    pub fn location(&self) -> Option<&str> {
        match self {
            ResourceDescription::ContainerGroup(group) => group.location.as_deref(),
            ResourceDescription::ContainerApp(app) => app.location.as_deref(),
        }
    }

    /// Public FQDN of a provisioned resource.
    ///
    /// Missing network properties, a missing address and a missing FQDN are
    /// reported separately: each points at a different misconfiguration.
    pub fn public_endpoint(&self, name: &str) -> Result<String, DeployError> {
        match self {
            ResourceDescription::ContainerGroup(group) => group.public_endpoint(name),
            ResourceDescription::ContainerApp(app) => app.public_endpoint(name),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

// ═══════════════════════════════════════════════════════════════════
// CONTAINER GROUP (Microsoft.ContainerInstance)
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ContainerGroupProperties>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroupProperties {
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub properties: ContainerProperties,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProperties {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<Vec<EnvironmentVar>>,
    #[serde(default)]
    pub resources: ContainerResources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl ContainerPort {
    pub fn tcp(port: u16) -> Self {
        Self {
            port,
            protocol: Some("TCP".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResources {
    pub requests: ResourceRequests,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequests {
    pub cpu: f64,
    #[serde(rename = "memoryInGB")]
    pub memory_in_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

impl ContainerGroup {
    pub fn public_endpoint(&self, name: &str) -> Result<String, DeployError> {
        let resource = || format!("container group {}", name);
        let properties = self
            .properties
            .as_ref()
            .ok_or_else(|| DeployError::NoNetworkProperties { resource: resource() })?;
        let address = properties
            .ip_address
            .as_ref()
            .ok_or_else(|| DeployError::NoAssignedAddress { resource: resource() })?;
        non_empty(address.fqdn.as_ref()).ok_or_else(|| DeployError::NoFqdn { resource: resource() })
    }
}

// ═══════════════════════════════════════════════════════════════════
// CONTAINER APP (Microsoft.App)
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerApp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ContainerAppProperties>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_environment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<AppConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<AppTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Ingress>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub target_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTemplate {
    #[serde(default)]
    pub containers: Vec<AppContainer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppContainer {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvironmentVar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<AppContainerResources>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppContainerResources {
    pub cpu: f64,
    /// Rendered with one decimal and a `Gi` suffix, e.g. `"0.5Gi"`.
    pub memory: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    pub min_replicas: u32,
    pub max_replicas: u32,
}

impl ContainerApp {
    pub fn public_endpoint(&self, name: &str) -> Result<String, DeployError> {
        let resource = || format!("container app {}", name);
        let configuration = self
            .properties
            .as_ref()
            .and_then(|p| p.configuration.as_ref())
            .ok_or_else(|| DeployError::NoNetworkProperties { resource: resource() })?;
        let ingress = configuration
            .ingress
            .as_ref()
            .ok_or_else(|| DeployError::NoAssignedAddress { resource: resource() })?;
        non_empty(ingress.fqdn.as_ref()).ok_or_else(|| DeployError::NoFqdn { resource: resource() })
    }
}

// ═══════════════════════════════════════════════════════════════════
// MANAGED ENVIRONMENT (Microsoft.App)
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ManagedEnvironmentProperties>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedEnvironmentProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_redundant: Option<bool>,
}

impl ManagedEnvironment {
    /// A single-zone environment, the cheapest option for previews.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            id: None,
            location: Some(location.into()),
            properties: Some(ManagedEnvironmentProperties {
                zone_redundant: Some(false),
            }),
        }
    }
}
