//! Stdout status reporter.
//!
//! Prints each outcome as one pretty JSON document so CI steps can pipe it
//! (`preview-deploy deploy ... | jq .url`). There is no message to update,
//! so repeated reports just print again.

use crate::error::DeployError;
use crate::naming::EnvironmentIdentity;
use crate::report::{DeploymentOutcome, StatusReporter};
use async_trait::async_trait;

/// Reporter that writes JSON to stdout.
pub struct StdoutReporter;

impl StdoutReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn render_deployment(
        identity: &EnvironmentIdentity,
        outcome: &DeploymentOutcome,
    ) -> Result<String, DeployError> {
        let json = serde_json::json!({
            "type": "deployment",
            "pull_request": identity.to_string(),
            "outcome": outcome,
        });
        serde_json::to_string_pretty(&json)
            .map_err(|e| DeployError::Report(format!("failed to serialize outcome: {}", e)))
    }

    pub fn render_teardown(identity: &EnvironmentIdentity) -> Result<String, DeployError> {
        let json = serde_json::json!({
            "type": "teardown",
            "pull_request": identity.to_string(),
        });
        serde_json::to_string_pretty(&json)
            .map_err(|e| DeployError::Report(format!("failed to serialize teardown: {}", e)))
    }
}

impl Default for StdoutReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusReporter for StdoutReporter {
    async fn report_deployment(
        &self,
        identity: &EnvironmentIdentity,
        outcome: &DeploymentOutcome,
    ) -> Result<(), DeployError> {
        println!("{}", Self::render_deployment(identity, outcome)?);
        Ok(())
    }

    async fn report_teardown(&self, identity: &EnvironmentIdentity) -> Result<(), DeployError> {
        println!("{}", Self::render_teardown(identity)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceSummary;
    use std::time::Duration;

    #[test]
    fn test_render_deployment() {
        let identity = EnvironmentIdentity::new("acme", "shop", 42).unwrap();
        let outcome = DeploymentOutcome {
            resource_group: "preview-acme-shop-pr42".into(),
            endpoint: "pv-pr42.eastus.azurecontainerapps.io".into(),
            url: "http://pv-pr42.eastus.azurecontainerapps.io".into(),
            services: vec![ServiceSummary {
                name: "web".into(),
                ports: vec![80],
            }],
            elapsed: Duration::from_millis(1500),
        };

        let rendered = StdoutReporter::render_deployment(&identity, &outcome).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["type"], "deployment");
        assert_eq!(value["pull_request"], "acme/shop#42");
        assert_eq!(value["outcome"]["url"], "http://pv-pr42.eastus.azurecontainerapps.io");
        assert_eq!(value["outcome"]["services"][0]["ports"][0], 80);
        assert_eq!(value["outcome"]["elapsed"], 1.5);

        let back: DeploymentOutcome = serde_json::from_value(value["outcome"].clone()).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_render_teardown() {
        let identity = EnvironmentIdentity::new("acme", "shop", 7).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&StdoutReporter::render_teardown(&identity).unwrap()).unwrap();
        assert_eq!(value["type"], "teardown");
        assert_eq!(value["pull_request"], "acme/shop#7");
    }
}
