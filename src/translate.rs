//! Environment spec → provider resource description.
//!
//! Pure functions: same spec in, same description out. Environment variables
//! are sorted by name so descriptions diff cleanly between runs.

use std::collections::HashMap;

use crate::platform::PlatformKind;
use crate::resource::{
    AppConfiguration, AppContainer, AppContainerResources, AppTemplate, Container,
    ContainerApp, ContainerAppProperties, ContainerGroup, ContainerGroupProperties,
    ContainerPort, ContainerProperties, ContainerResources, EnvironmentVar, Ingress, IpAddress,
    ResourceDescription, ResourceRequests, Scale,
};
use crate::types::{EnvironmentSpec, ServiceSpec};

/// Ingress target when no service declares a port.
pub const DEFAULT_INGRESS_PORT: u16 = 80;

/// Previews scale to zero when idle and never past one replica.
pub const PREVIEW_SCALE: Scale = Scale {
    min_replicas: 0,
    max_replicas: 1,
};

/// Translate `spec` into the shape of `platform`.
///
/// `hosting_environment_id` is the managed environment the application
/// belongs to; the container-group platform ignores it.
pub fn translate(
    spec: &EnvironmentSpec,
    platform: PlatformKind,
    hosting_environment_id: Option<&str>,
) -> ResourceDescription {
    match platform {
        PlatformKind::ContainerGroup => ResourceDescription::ContainerGroup(container_group(spec)),
        PlatformKind::ManagedApplication => {
            ResourceDescription::ContainerApp(container_app(spec, hosting_environment_id))
        }
    }
}

/// Every service becomes a container; every declared port is exposed on the
/// group's public address.
pub fn container_group(spec: &EnvironmentSpec) -> ContainerGroup {
    let containers = spec
        .deployable_services()
        .map(|service| Container {
            name: service.name.clone(),
            properties: ContainerProperties {
                image: service.image.clone(),
                ports: service.ports.iter().copied().map(ContainerPort::tcp).collect(),
                environment_variables: env_vars(&service.environment),
                resources: ContainerResources {
                    requests: ResourceRequests {
                        cpu: service.effective_cpu(),
                        memory_in_gb: service.effective_memory_gb(),
                    },
                },
            },
        })
        .collect();

    let ports = exposed_ports(spec.deployable_services());
    let ip_address = (!ports.is_empty()).then(|| IpAddress {
        kind: "Public".into(),
        ports: ports.into_iter().map(ContainerPort::tcp).collect(),
        dns_name_label: spec.dns_label.clone(),
        ip: None,
        fqdn: None,
    });

    ContainerGroup {
        id: None,
        location: Some(spec.location.clone()),
        properties: Some(ContainerGroupProperties {
            containers,
            os_type: Some("Linux".into()),
            restart_policy: Some("Always".into()),
            ip_address,
            provisioning_state: None,
        }),
    }
}

/// One container app with a single external ingress.
pub fn container_app(spec: &EnvironmentSpec, hosting_environment_id: Option<&str>) -> ContainerApp {
    let containers = spec
        .deployable_services()
        .map(|service| AppContainer {
            name: service.name.clone(),
            image: service.image.clone(),
            env: env_vars(&service.environment),
            resources: Some(AppContainerResources {
                cpu: service.effective_cpu(),
                memory: memory_quantity(service.effective_memory_gb()),
            }),
        })
        .collect();

    let target_port = ingress_port(spec.deployable_services()).unwrap_or(DEFAULT_INGRESS_PORT);

    ContainerApp {
        id: None,
        location: Some(spec.location.clone()),
        properties: Some(ContainerAppProperties {
            managed_environment_id: hosting_environment_id.map(str::to_string),
            configuration: Some(AppConfiguration {
                ingress: Some(Ingress {
                    external: true,
                    target_port,
                    transport: Some("auto".into()),
                    fqdn: None,
                }),
            }),
            template: Some(AppTemplate {
                containers,
                scale: Some(PREVIEW_SCALE),
            }),
            provisioning_state: None,
        }),
    }
}

/// Environment variables sorted by name. Empty maps translate to `None`,
/// never to a list holding one empty entry.
pub fn env_vars(environment: &HashMap<String, String>) -> Option<Vec<EnvironmentVar>> {
    if environment.is_empty() {
        return None;
    }

    let mut keys: Vec<&String> = environment.keys().collect();
    keys.sort();

    Some(
        keys.into_iter()
            .map(|key| EnvironmentVar {
                name: key.clone(),
                value: environment[key].clone(),
            })
            .collect(),
    )
}

/// First port of the first service, in declaration order, that declares any.
pub fn ingress_port<'a>(services: impl IntoIterator<Item = &'a ServiceSpec>) -> Option<u16> {
    services
        .into_iter()
        .find_map(|service| service.ports.first().copied())
}

/// All declared ports, first occurrence wins.
pub fn exposed_ports<'a>(services: impl IntoIterator<Item = &'a ServiceSpec>) -> Vec<u16> {
    let mut ports = Vec::new();
    for service in services {
        for port in &service.ports {
            if !ports.contains(port) {
                ports.push(*port);
            }
        }
    }
    ports
}

/// `0.5` → `"0.5Gi"`.
pub fn memory_quantity(gb: f64) -> String {
    format!("{:.1}Gi", gb)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_ID: &str =
        "/subscriptions/xxx/resourceGroups/rg/providers/Microsoft.App/managedEnvironments/env";

    fn web() -> ServiceSpec {
        ServiceSpec::new("web", "nginx:alpine")
            .with_ports([80])
            .with_env("FOO", "bar")
    }

    fn spec(services: Vec<ServiceSpec>) -> EnvironmentSpec {
        EnvironmentSpec::new("rg", "pv-pr1", "eastus")
            .with_services(services)
            .with_dns_label("pv-acme-shop-pr1")
    }

    fn app_properties(app: &ContainerApp) -> &ContainerAppProperties {
        app.properties.as_ref().unwrap()
    }

    #[test]
    fn test_container_app() {
        let app = container_app(&spec(vec![web()]), Some(ENV_ID));

        assert_eq!(app.location.as_deref(), Some("eastus"));
        let props = app_properties(&app);
        assert_eq!(props.managed_environment_id.as_deref(), Some(ENV_ID));

        let template = props.template.as_ref().unwrap();
        assert_eq!(template.containers.len(), 1);
        assert_eq!(template.containers[0].name, "web");
        assert_eq!(template.containers[0].image, "nginx:alpine");

        let ingress = props.configuration.as_ref().unwrap().ingress.as_ref().unwrap();
        assert!(ingress.external);
        assert_eq!(ingress.target_port, 80);
        assert_eq!(ingress.transport.as_deref(), Some("auto"));

        assert_eq!(template.scale, Some(Scale { min_replicas: 0, max_replicas: 1 }));
    }

    #[test]
    fn test_env_vars_sorted() {
        let env: HashMap<String, String> = [("B", "b"), ("A", "a"), ("C", "c")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let vars = env_vars(&env).unwrap();
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(vars[0].value, "a");
    }

    #[test]
    fn test_env_vars_empty() {
        assert_eq!(env_vars(&HashMap::new()), None);

        let app = container_app(&spec(vec![ServiceSpec::new("web", "nginx")]), Some(ENV_ID));
        let container = &app_properties(&app).template.as_ref().unwrap().containers[0];
        assert_eq!(container.env, None);

        let json = serde_json::to_value(container).unwrap();
        assert!(json.get("env").is_none());
    }

    #[test]
    fn test_zero_resources_get_defaults() {
        let service = web().with_resources(0.0, 0.0);

        let app = container_app(&spec(vec![service.clone()]), Some(ENV_ID));
        let resources = app_properties(&app).template.as_ref().unwrap().containers[0]
            .resources
            .clone()
            .unwrap();
        assert_eq!(resources.cpu, 0.5);
        assert_eq!(resources.memory, "0.5Gi");

        let group = container_group(&spec(vec![service]));
        let requests = &group.properties.unwrap().containers[0].properties.resources.requests;
        assert_eq!(requests.cpu, 0.5);
        assert_eq!(requests.memory_in_gb, 0.5);
    }

    #[test]
    fn test_ingress_skips_services_without_ports() {
        let worker = ServiceSpec::new("worker", "busybox");
        let api = ServiceSpec::new("api", "api:latest").with_ports([8080, 9090]);

        assert_eq!(ingress_port([&worker, &api]), Some(8080));

        let app = container_app(&spec(vec![worker, api]), Some(ENV_ID));
        let ingress = app_properties(&app)
            .configuration
            .as_ref()
            .unwrap()
            .ingress
            .clone()
            .unwrap();
        assert_eq!(ingress.target_port, 8080);
    }

    #[test]
    fn test_ingress_uses_declaration_order() {
        let first = ServiceSpec::new("zeta", "z").with_ports([3000]);
        let second = ServiceSpec::new("alpha", "a").with_ports([80]);
        assert_eq!(ingress_port([&first, &second]), Some(3000));
    }

    #[test]
    fn test_ingress_defaults_to_80() {
        let app = container_app(&spec(vec![ServiceSpec::new("worker", "busybox")]), Some(ENV_ID));
        let ingress = app_properties(&app)
            .configuration
            .as_ref()
            .unwrap()
            .ingress
            .clone()
            .unwrap();
        assert_eq!(ingress.target_port, DEFAULT_INGRESS_PORT);
    }

    #[test]
    fn test_build_only_services_excluded() {
        let api = ServiceSpec::new("api", "").with_ports([8080]);
        let description = translate(
            &spec(vec![api, web()]),
            PlatformKind::ManagedApplication,
            Some(ENV_ID),
        );

        let ResourceDescription::ContainerApp(app) = description else {
            panic!("expected a container app");
        };
        let template = app_properties(&app).template.as_ref().unwrap();
        assert_eq!(template.containers.len(), 1);
        assert_eq!(template.containers[0].name, "web");
        assert_eq!(
            app_properties(&app).configuration.as_ref().unwrap().ingress.as_ref().unwrap().target_port,
            80
        );
    }

    #[test]
    fn test_container_group_exposes_every_port() {
        let api = ServiceSpec::new("api", "api:latest").with_ports([8080, 80]);
        let group = container_group(&spec(vec![web(), api]));
        let props = group.properties.unwrap();

        assert_eq!(props.containers.len(), 2);
        assert_eq!(props.os_type.as_deref(), Some("Linux"));

        let address = props.ip_address.unwrap();
        assert_eq!(address.kind, "Public");
        assert_eq!(address.dns_name_label.as_deref(), Some("pv-acme-shop-pr1"));
        let ports: Vec<u16> = address.ports.iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![80, 8080]);
    }

    #[test]
    fn test_translation_is_deterministic() {
        let service = ServiceSpec::new("web", "nginx")
            .with_ports([80])
            .with_env("Z", "1")
            .with_env("M", "2")
            .with_env("A", "3");
        let spec = spec(vec![service]);

        let a = serde_json::to_string(&translate(&spec, PlatformKind::ManagedApplication, Some(ENV_ID)))
            .unwrap();
        let b = serde_json::to_string(&translate(&spec, PlatformKind::ManagedApplication, Some(ENV_ID)))
            .unwrap();
        assert_eq!(a, b);
        assert!(a.find("\"A\"").unwrap() < a.find("\"M\"").unwrap());
        assert!(a.find("\"M\"").unwrap() < a.find("\"Z\"").unwrap());
    }

    #[test]
    fn test_memory_quantity() {
        assert_eq!(memory_quantity(0.5), "0.5Gi");
        assert_eq!(memory_quantity(2.0), "2.0Gi");
    }
}
