//! Scripted in-memory `CloudBackend` for driving the deployer.
//!
//! Every call is recorded by name. Failures are scripted per call name:
//! a queue of one-shot faults, then an optional fault that repeats forever.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use preview_deploy_rs::resource::{
    AppConfiguration, ContainerApp, ContainerAppProperties, ContainerGroup,
    ContainerGroupProperties, Ingress, IpAddress,
};
use preview_deploy_rs::{
    BackoffShape, CloudBackend, DeployError, DeployerConfig, ManagedEnvironment, Operation,
    OperationState, PendingOperation, PlatformKind, ResourceDescription, RetryBudgets, Tracking,
};

pub const CREATE_GROUP: &str = "create_group";
pub const DELETE_GROUP: &str = "delete_group";
pub const CREATE_ENV: &str = "create_env";
pub const GET_ENV: &str = "get_env";
pub const SUBMIT: &str = "submit";
pub const GET_APP: &str = "get_app";
pub const DELETE_APP: &str = "delete_app";
pub const POLL: &str = "poll";

pub const ENV_ID: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.App/managedEnvironments/env";
pub const FQDN: &str = "pv-pr42.nicebeach.eastus.azurecontainerapps.io";

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Network hiccup.
    Transient,
    /// Provider error with this code.
    Code(&'static str),
}

impl Fault {
    fn error(self) -> DeployError {
        match self {
            Fault::Transient => DeployError::Transport("connection reset by peer".into()),
            Fault::Code(code) => DeployError::provider(code, "scripted failure"),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    once: VecDeque<Fault>,
    always: Option<Fault>,
}

#[derive(Debug)]
pub struct MockBackend {
    calls: Mutex<Vec<&'static str>>,
    scripts: Mutex<HashMap<&'static str, Script>>,
    submitted: Mutex<Vec<ResourceDescription>>,
    /// Polls answered `Running` before `Succeeded`.
    running_polls: u32,
    polls_seen: Mutex<u32>,
    submit_delay: Option<Duration>,
    environment_id: Option<String>,
    fqdn: Option<String>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            scripts: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            running_polls: 1,
            polls_seen: Mutex::new(0),
            submit_delay: None,
            environment_id: Some(ENV_ID.to_string()),
            fqdn: Some(FQDN.to_string()),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `call` once per entry in `faults`, in order.
    pub fn fail_then_succeed(self, call: &'static str, faults: &[Fault]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(call)
            .or_default()
            .once
            .extend(faults.iter().copied());
        self
    }

    /// Fail `call` every time.
    pub fn fail_always(self, call: &'static str, fault: Fault) -> Self {
        self.scripts.lock().unwrap().entry(call).or_default().always = Some(fault);
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Every poll answers `Running`; no operation ever finishes.
    pub fn with_endless_polls(mut self) -> Self {
        self.running_polls = u32::MAX;
        self
    }

    pub fn without_environment_id(mut self) -> Self {
        self.environment_id = None;
        self
    }

    pub fn without_fqdn(mut self) -> Self {
        self.fqdn = None;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn submitted(&self) -> Vec<ResourceDescription> {
        self.submitted.lock().unwrap().clone()
    }

    fn enter(&self, call: &'static str) -> Result<(), DeployError> {
        self.calls.lock().unwrap().push(call);
        let mut scripts = self.scripts.lock().unwrap();
        let fault = scripts
            .get_mut(call)
            .and_then(|script| script.once.pop_front().or(script.always));
        match fault {
            Some(fault) => Err(fault.error()),
            None => Ok(()),
        }
    }

    fn pending(call: &str) -> Operation {
        Operation::Pending(PendingOperation {
            status_url: format!("https://management.example/operations/{call}"),
            tracking: Tracking::StatusDocument,
        })
    }
}

impl CloudBackend for MockBackend {
    async fn create_or_update_resource_group(
        &self,
        _name: &str,
        _location: &str,
    ) -> Result<(), DeployError> {
        self.enter(CREATE_GROUP)
    }

    async fn begin_delete_resource_group(&self, _name: &str) -> Result<Operation, DeployError> {
        self.enter(DELETE_GROUP)?;
        Ok(Operation::Done)
    }

    async fn begin_create_or_update_environment(
        &self,
        _resource_group: &str,
        _name: &str,
        _environment: &ManagedEnvironment,
    ) -> Result<Operation, DeployError> {
        self.enter(CREATE_ENV)?;
        Ok(Operation::Done)
    }

    async fn get_environment(
        &self,
        _resource_group: &str,
        _name: &str,
    ) -> Result<ManagedEnvironment, DeployError> {
        self.enter(GET_ENV)?;
        Ok(ManagedEnvironment {
            id: self.environment_id.clone(),
            ..ManagedEnvironment::new("eastus")
        })
    }

    async fn begin_create_or_update_application(
        &self,
        _resource_group: &str,
        _name: &str,
        description: &ResourceDescription,
    ) -> Result<Operation, DeployError> {
        self.enter(SUBMIT)?;
        self.submitted.lock().unwrap().push(description.clone());
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::pending(SUBMIT))
    }

    async fn get_application(
        &self,
        _resource_group: &str,
        _name: &str,
        platform: PlatformKind,
    ) -> Result<ResourceDescription, DeployError> {
        self.enter(GET_APP)?;
        Ok(match platform {
            PlatformKind::ContainerGroup => ResourceDescription::ContainerGroup(ContainerGroup {
                properties: Some(ContainerGroupProperties {
                    ip_address: Some(IpAddress {
                        kind: "Public".into(),
                        fqdn: self.fqdn.clone(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            PlatformKind::ManagedApplication => ResourceDescription::ContainerApp(ContainerApp {
                properties: Some(ContainerAppProperties {
                    configuration: Some(AppConfiguration {
                        ingress: Some(Ingress {
                            external: true,
                            target_port: 80,
                            transport: Some("auto".into()),
                            fqdn: self.fqdn.clone(),
                        }),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        })
    }

    async fn begin_delete_application(
        &self,
        _resource_group: &str,
        _name: &str,
        _platform: PlatformKind,
    ) -> Result<Operation, DeployError> {
        self.enter(DELETE_APP)?;
        Ok(Self::pending(DELETE_APP))
    }

    async fn poll_operation(
        &self,
        _operation: &PendingOperation,
    ) -> Result<OperationState, DeployError> {
        self.enter(POLL)?;
        let mut seen = self.polls_seen.lock().unwrap();
        *seen += 1;
        if *seen <= self.running_polls {
            Ok(OperationState::Running)
        } else {
            *seen = 0;
            Ok(OperationState::Succeeded)
        }
    }
}

/// Millisecond budgets and intervals so scenarios run instantly.
pub fn fast_config(platform: PlatformKind) -> DeployerConfig {
    let budget = Duration::from_millis(200);
    DeployerConfig {
        platform,
        budgets: RetryBudgets {
            short: budget,
            medium: budget,
            long: budget,
        },
        cleanup_budget: budget,
        poll_interval: Duration::from_millis(1),
        backoff: BackoffShape {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            multiplier: 2.0,
            randomization_factor: 0.0,
        },
    }
}
