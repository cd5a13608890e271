//! Service descriptors: where the list of services to deploy comes from.
//!
//! A descriptor names services and, for each, an image, published ports and
//! environment. Services that only carry a build context (no image) are
//! skipped with a [`DeployEvent::ServiceSkipped`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::error::DeployError;
use crate::observer::{DeployEvent, DeployObserver};
use crate::types::ServiceSpec;

/// Read-only view over a parsed service descriptor.
pub trait DescriptorSource {
    /// Service names, in a stable order.
    fn service_names(&self) -> Vec<String>;

    /// Image reference; `None` or blank for build-only services.
    fn image(&self, service: &str) -> Option<String>;

    /// Container ports the service publishes, in declaration order.
    fn published_ports(&self, service: &str) -> Vec<u16>;

    fn environment(&self, _service: &str) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Turn a descriptor into service specs, skipping build-only services.
pub fn collect_services(
    source: &dyn DescriptorSource,
    observer: &dyn DeployObserver,
) -> Vec<ServiceSpec> {
    let mut services = Vec::new();
    for name in source.service_names() {
        let image = source.image(&name).unwrap_or_default();
        if image.trim().is_empty() {
            observer.on_event(&DeployEvent::ServiceSkipped { service: name });
            continue;
        }

        let mut service = ServiceSpec::new(name.as_str(), image).with_ports(source.published_ports(&name));
        service.environment = source.environment(&name);
        services.push(service);
    }
    services
}

// ═══════════════════════════════════════════════════════════════════
// STATIC
// ═══════════════════════════════════════════════════════════════════

/// In-memory descriptor, mostly for tests and programmatic callers.
#[derive(Debug, Clone, Default)]
pub struct StaticDescriptor {
    services: Vec<ServiceSpec>,
}

impl StaticDescriptor {
    pub fn new(services: Vec<ServiceSpec>) -> Self {
        Self { services }
    }

    fn find(&self, service: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == service)
    }
}

impl DescriptorSource for StaticDescriptor {
    fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    fn image(&self, service: &str) -> Option<String> {
        self.find(service).map(|s| s.image.clone())
    }

    fn published_ports(&self, service: &str) -> Vec<u16> {
        self.find(service).map(|s| s.ports.clone()).unwrap_or_default()
    }

    fn environment(&self, service: &str) -> HashMap<String, String> {
        self.find(service)
            .map(|s| s.environment.clone())
            .unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════════════
// COMPOSE
// ═══════════════════════════════════════════════════════════════════

/// The subset of a compose file needed for previews: image, ports and
/// environment per service. Everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeDescriptor {
    #[serde(default)]
    services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ComposeService {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    ports: Vec<ComposePort>,
    #[serde(default)]
    environment: Option<ComposeEnvironment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ComposePort {
    Number(u64),
    Short(String),
    Long {
        #[serde(default)]
        target: Option<u64>,
        #[serde(default)]
        published: Option<PublishedPort>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PublishedPort {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ComposeEnvironment {
    Map(BTreeMap<String, Option<serde_yaml::Value>>),
    List(Vec<String>),
}

impl ComposeDescriptor {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DeployError::Descriptor(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, DeployError> {
        serde_yaml::from_str(content).map_err(|e| DeployError::Descriptor(e.to_string()))
    }
}

impl DescriptorSource for ComposeDescriptor {
    fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    fn image(&self, service: &str) -> Option<String> {
        self.services.get(service).and_then(|s| s.image.clone())
    }

    fn published_ports(&self, service: &str) -> Vec<u16> {
        let Some(service) = self.services.get(service) else {
            return Vec::new();
        };
        service.ports.iter().filter_map(ComposePort::published).collect()
    }

    fn environment(&self, service: &str) -> HashMap<String, String> {
        match self.services.get(service).and_then(|s| s.environment.as_ref()) {
            Some(ComposeEnvironment::Map(map)) => map
                .iter()
                .map(|(key, value)| (key.clone(), yaml_scalar(value.as_ref())))
                .collect(),
            Some(ComposeEnvironment::List(entries)) => entries
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((key, value)) => (key.to_string(), value.to_string()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
            None => HashMap::new(),
        }
    }
}

impl ComposePort {
    /// Container port, if it has a valid published side.
    fn published(&self) -> Option<u16> {
        match self {
            // A bare number exposes a container port without publishing it.
            ComposePort::Number(_) => None,
            ComposePort::Short(text) => {
                let without_protocol = text.split('/').next().unwrap_or(text);
                let mut parts: Vec<&str> = without_protocol.split(':').collect();
                if parts.len() < 2 {
                    return None;
                }
                let target = parts.pop()?;
                parse_port(parts.pop()?)?;
                parse_port(target)
            }
            ComposePort::Long { target, published } => {
                match published.as_ref()? {
                    PublishedPort::Number(n) => valid_port(*n)?,
                    PublishedPort::Text(text) => parse_port(text)?,
                };
                valid_port((*target)?)
            }
        }
    }
}

fn parse_port(text: &str) -> Option<u16> {
    text.trim().parse::<u64>().ok().and_then(valid_port)
}

fn valid_port(n: u64) -> Option<u16> {
    u16::try_from(n).ok().filter(|p| *p > 0)
}

fn yaml_scalar(value: Option<&serde_yaml::Value>) -> String {
    match value {
        None | Some(serde_yaml::Value::Null) => String::new(),
        Some(serde_yaml::Value::String(s)) => s.clone(),
        Some(serde_yaml::Value::Bool(b)) => b.to_string(),
        Some(serde_yaml::Value::Number(n)) => n.to_string(),
        Some(other) => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
