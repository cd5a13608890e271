//! Status reporting for deploy and teardown outcomes.
//!
//! - [`StatusReporter`] trait: where outcomes go (a PR comment, a log, a pipe)
//! - [`StdoutReporter`]: JSON lines on stdout
//! - [`NoopReporter`]: drops everything
//!
//! Implementations own idempotency: reporting the same PR twice updates one
//! message rather than adding another.

pub mod stdout;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeployError;
use crate::naming::EnvironmentIdentity;
use crate::types::ServiceSummary;

pub use stdout::StdoutReporter;

/// A successful deployment, as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub resource_group: String,
    /// Bare FQDN.
    pub endpoint: String,
    /// `http://<endpoint>`.
    pub url: String,
    pub services: Vec<ServiceSummary>,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

/// Where deploy and teardown outcomes are published.
///
/// Errors are returned to the caller, which logs them; they never change
/// the outcome of the deploy or teardown itself.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report_deployment(
        &self,
        identity: &EnvironmentIdentity,
        outcome: &DeploymentOutcome,
    ) -> Result<(), DeployError>;

    async fn report_teardown(&self, identity: &EnvironmentIdentity) -> Result<(), DeployError>;
}

/// Reporter that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

#[async_trait]
impl StatusReporter for NoopReporter {
    async fn report_deployment(
        &self,
        _identity: &EnvironmentIdentity,
        _outcome: &DeploymentOutcome,
    ) -> Result<(), DeployError> {
        Ok(())
    }

    async fn report_teardown(&self, _identity: &EnvironmentIdentity) -> Result<(), DeployError> {
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
