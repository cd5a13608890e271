//! Preview Deploy Library
//!
//! Short-lived, per-pull-request preview environments on Azure.
//!
//! # Design
//!
//! Every preview lives in its own resource group, named deterministically
//! from the repository and PR number. The [`Deployer`] ensures the group,
//! submits the application, polls it to completion and extracts its public
//! endpoint. If anything fails after the group exists, the group is deleted
//! before the original error is returned, so a failed deploy leaves nothing
//! billable behind.
//!
//! The provider sits behind the [`CloudBackend`] trait. [`ArmClient`]
//! (feature `default-client`) implements it over the ARM REST API; tests
//! implement it in memory.
//!
//! # Usage
//!
//! ```ignore
//! use preview_deploy_rs::{
//!     Deployer, DeployerConfig, EnvironmentIdentity, EnvironmentNames, EnvironmentSpec,
//!     ServiceSpec, TracingObserver,
//! };
//!
//! let identity = EnvironmentIdentity::new("acme", "shop", 42)?;
//! let names = EnvironmentNames::derive(&identity)?;
//! let spec = EnvironmentSpec::new(names.resource_group, names.application, "eastus")
//!     .with_dns_label(names.dns_label)
//!     .with_service(ServiceSpec::new("web", "nginx:alpine").with_ports([80]));
//!
//! let observer = TracingObserver;
//! let deployer = Deployer::new(&backend, &observer, DeployerConfig::default());
//! let result = deployer.deploy(&spec).await?;
//! println!("preview at {}", result.url());
//! ```

pub mod backend;
pub mod deployer;
pub mod descriptor;
pub mod error;
pub mod lro;
pub mod naming;
pub mod observer;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod resource;
pub mod resource_group;
pub mod retry;
pub mod state;
pub mod translate;
pub mod types;

#[cfg(feature = "default-client")]
pub mod client;

// Re-export the main types at crate root for convenience
pub use backend::CloudBackend;
pub use deployer::{Deployer, DeployerConfig};
pub use descriptor::{collect_services, ComposeDescriptor, DescriptorSource, StaticDescriptor};
pub use error::DeployError;
pub use naming::{EnvironmentIdentity, EnvironmentNames};
pub use observer::{DeployEvent, DeployObserver, RecordingObserver, TracingObserver};
pub use pipeline::{PipelineOutcome, PipelineSettings, PreviewPipeline, PullRequestAction};
pub use platform::PlatformKind;
pub use report::{DeploymentOutcome, NoopReporter, StatusReporter, StdoutReporter};
pub use resource::{ManagedEnvironment, ResourceDescription};
pub use resource_group::ResourceGroups;
pub use retry::{BackoffShape, RetryBudgets, RetryPolicy};
pub use state::DeployPhase;
pub use translate::translate;
pub use types::*;

#[cfg(feature = "default-client")]
pub use client::{AccessToken, ArmClient, ClientConfig};
