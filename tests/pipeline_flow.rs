//! Pull-request level flow: naming, descriptor, deploy/teardown, reporting.

mod common;

use async_trait::async_trait;
use common::*;
use preview_deploy_rs::{
    ComposeDescriptor, DeployError, DeployEvent, Deployer, DeploymentOutcome,
    EnvironmentIdentity, PipelineOutcome, PipelineSettings, PlatformKind, PreviewPipeline,
    PullRequestAction, RecordingObserver, ServiceSpec, StaticDescriptor, StatusReporter,
};
use std::sync::Mutex;

/// Records reports; optionally fails every one of them.
#[derive(Default)]
struct RecordingReporter {
    deployments: Mutex<Vec<DeploymentOutcome>>,
    teardowns: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingReporter {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn report_deployment(
        &self,
        _identity: &EnvironmentIdentity,
        outcome: &DeploymentOutcome,
    ) -> Result<(), DeployError> {
        if self.fail {
            return Err(DeployError::Report("comment API returned 502".into()));
        }
        self.deployments.lock().unwrap().push(outcome.clone());
        Ok(())
    }

    async fn report_teardown(&self, identity: &EnvironmentIdentity) -> Result<(), DeployError> {
        if self.fail {
            return Err(DeployError::Report("comment API returned 502".into()));
        }
        self.teardowns.lock().unwrap().push(identity.to_string());
        Ok(())
    }
}

fn identity() -> EnvironmentIdentity {
    EnvironmentIdentity::new("acme", "shop", 42).unwrap()
}

fn frontend_and_api() -> StaticDescriptor {
    StaticDescriptor::new(vec![
        ServiceSpec::new("frontend", "nginx:alpine").with_ports([80]),
        ServiceSpec::new("api", "").with_ports([8080]),
    ])
}

#[tokio::test]
async fn test_deploy_reports_outcome() {
    let backend = MockBackend::new();
    let observer = RecordingObserver::new();
    let reporter = RecordingReporter::default();
    let deployer = Deployer::new(&backend, &observer, fast_config(PlatformKind::ManagedApplication));
    let pipeline = PreviewPipeline::new(deployer, &reporter, &observer, PipelineSettings::default());

    let outcome = pipeline.deploy(&identity(), &frontend_and_api()).await.unwrap();

    assert_eq!(outcome.resource_group, "preview-acme-shop-pr42");
    assert_eq!(outcome.endpoint, FQDN);
    assert_eq!(outcome.url, format!("http://{FQDN}"));
    let services: Vec<&str> = outcome.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(services, vec!["frontend"]);
    assert_eq!(outcome.services[0].ports, vec![80]);

    assert_eq!(reporter.deployments.lock().unwrap().len(), 1);
    assert_eq!(
        observer.count(|e| matches!(e, DeployEvent::ServiceSkipped { service } if service == "api")),
        1
    );
}

#[tokio::test]
async fn test_reporter_failure_is_not_fatal() {
    let backend = MockBackend::new();
    let observer = RecordingObserver::new();
    let reporter = RecordingReporter::failing();
    let deployer = Deployer::new(&backend, &observer, fast_config(PlatformKind::ManagedApplication));
    let pipeline = PreviewPipeline::new(deployer, &reporter, &observer, PipelineSettings::default());

    let outcome = pipeline
        .handle(PullRequestAction::Deploy, &identity(), &frontend_and_api())
        .await
        .unwrap();
    assert!(matches!(outcome, PipelineOutcome::Deployed(_)));

    let torn_down = pipeline.teardown(&identity()).await.unwrap();
    assert_eq!(torn_down, "preview-acme-shop-pr42");

    assert_eq!(
        observer.count(|e| matches!(e, DeployEvent::ReportFailed { .. })),
        2
    );
}

#[tokio::test]
async fn test_failed_deploy_is_not_reported() {
    let backend = MockBackend::new().fail_always(SUBMIT, Fault::Code("AuthorizationFailed"));
    let observer = RecordingObserver::new();
    let reporter = RecordingReporter::default();
    let deployer = Deployer::new(&backend, &observer, fast_config(PlatformKind::ManagedApplication));
    let pipeline = PreviewPipeline::new(deployer, &reporter, &observer, PipelineSettings::default());

    let err = pipeline.deploy(&identity(), &frontend_and_api()).await.unwrap_err();

    assert_eq!(err.code(), Some("AuthorizationFailed"));
    assert!(reporter.deployments.lock().unwrap().is_empty());
    assert_eq!(backend.count(DELETE_GROUP), 1);
}

#[tokio::test]
async fn test_closed_action_tears_down() {
    let backend = MockBackend::new();
    let observer = RecordingObserver::new();
    let reporter = RecordingReporter::default();
    let deployer = Deployer::new(&backend, &observer, fast_config(PlatformKind::ManagedApplication));
    let pipeline = PreviewPipeline::new(deployer, &reporter, &observer, PipelineSettings::default());

    let action: PullRequestAction = "closed".parse().unwrap();
    let outcome = pipeline
        .handle(action, &identity(), &StaticDescriptor::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::TornDown {
            resource_group: "preview-acme-shop-pr42".into()
        }
    );
    assert_eq!(backend.calls(), vec![DELETE_GROUP]);
    assert_eq!(*reporter.teardowns.lock().unwrap(), vec!["acme/shop#42".to_string()]);
}

#[tokio::test]
async fn test_ignored_action_makes_no_calls() {
    let backend = MockBackend::new();
    let observer = RecordingObserver::new();
    let reporter = RecordingReporter::default();
    let deployer = Deployer::new(&backend, &observer, fast_config(PlatformKind::ManagedApplication));
    let pipeline = PreviewPipeline::new(deployer, &reporter, &observer, PipelineSettings::default());

    let action: PullRequestAction = "labeled".parse().unwrap();
    let outcome = pipeline
        .handle(action, &identity(), &frontend_and_api())
        .await
        .unwrap();

    assert_eq!(outcome, PipelineOutcome::Ignored);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_long_repository_shortens_dns_label() {
    let backend = MockBackend::new();
    let observer = RecordingObserver::new();
    let reporter = RecordingReporter::default();
    let deployer = Deployer::new(&backend, &observer, fast_config(PlatformKind::ContainerGroup));
    let pipeline = PreviewPipeline::new(deployer, &reporter, &observer, PipelineSettings::default());

    let identity =
        EnvironmentIdentity::new("acme", "a-very-long-repository-name-for-a-monorepo-service-api", 7)
            .unwrap();
    let spec = pipeline
        .environment_spec(&identity, &frontend_and_api())
        .unwrap();

    assert_eq!(spec.dns_label.as_deref(), Some("pv-pr7"));
    assert_eq!(
        observer.events(),
        vec![
            DeployEvent::DnsLabelShortened {
                label: "pv-pr7".into()
            },
            DeployEvent::ServiceSkipped {
                service: "api".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_compose_descriptor_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docker-compose.yml");
    std::fs::write(
        &path,
        r#"
services:
  web:
    image: ghcr.io/acme/shop-web:pr-42
    ports: ["3000:3000"]
    environment:
      NODE_ENV: preview
  api:
    build: ./api
"#,
    )
    .unwrap();
    let source = ComposeDescriptor::from_path(&path).unwrap();

    let backend = MockBackend::new();
    let observer = RecordingObserver::new();
    let reporter = RecordingReporter::default();
    let deployer = Deployer::new(&backend, &observer, fast_config(PlatformKind::ManagedApplication));
    let pipeline = PreviewPipeline::new(deployer, &reporter, &observer, PipelineSettings::default());

    let outcome = pipeline.deploy(&identity(), &source).await.unwrap();

    assert_eq!(outcome.services.len(), 1);
    assert_eq!(outcome.services[0].name, "web");
    assert_eq!(outcome.services[0].ports, vec![3000]);
}
