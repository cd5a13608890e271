//! Azure Resource Manager client.
//!
//! Implements [`CloudBackend`] over the ARM REST API with `reqwest`.
//! Credentials are an opaque bearer token obtained elsewhere (`az account
//! get-access-token`, a workload identity exchange, ...).
//!
//! # Quick Start
//!
//! ```ignore
//! use preview_deploy_rs::{AccessToken, ArmClient, ClientConfig, Deployer, TracingObserver};
//!
//! let client = ArmClient::new(
//!     "00000000-0000-0000-0000-000000000000",
//!     AccessToken::new(std::env::var("AZURE_ACCESS_TOKEN")?),
//!     ClientConfig::default(),
//! )?;
//! let observer = TracingObserver;
//! let deployer = Deployer::new(&client, &observer, Default::default());
//! let result = deployer.deploy(&spec).await?;
//! println!("{}", result.url());
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::backend::CloudBackend;
use crate::error::DeployError;
use crate::platform::PlatformKind;
use crate::resource::{ContainerApp, ContainerGroup, ManagedEnvironment, ResourceDescription};
use crate::types::{Operation, OperationState, PendingOperation, ProviderFault, Tracking};

/// Header carrying a status-document URL for long-running operations.
pub const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";

/// Endpoint and API versions.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub resource_groups_api_version: String,
    pub container_instance_api_version: String,
    pub container_apps_api_version: String,
    /// Per-request timeout. Long-running operations are polled, so no
    /// single request should take long.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://management.azure.com".into(),
            resource_groups_api_version: "2021-04-01".into(),
            container_instance_api_version: "2023-05-01".into(),
            container_apps_api_version: "2024-03-01".into(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Bearer token for ARM. Never printed.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// ARM client scoped to one subscription.
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    config: ClientConfig,
    subscription_id: String,
    token: AccessToken,
}

impl ArmClient {
    pub fn new(
        subscription_id: impl Into<String>,
        token: AccessToken,
        config: ClientConfig,
    ) -> Result<Self, DeployError> {
        let subscription_id = subscription_id.into();
        if subscription_id.trim().is_empty() {
            return Err(DeployError::Config("subscription ID is empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DeployError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            subscription_id,
            token,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    // ═══════════════════════════════════════════════════════════════
    // URLS
    // ═══════════════════════════════════════════════════════════════

    fn subscription_url(&self) -> String {
        format!(
            "{}/subscriptions/{}",
            self.config.base_url.trim_end_matches('/'),
            self.subscription_id
        )
    }

    fn resource_group_url(&self, name: &str) -> String {
        format!(
            "{}/resourcegroups/{}?api-version={}",
            self.subscription_url(),
            name,
            self.config.resource_groups_api_version
        )
    }

    fn resource_url(&self, resource_group: &str, kind: &str, name: &str, api_version: &str) -> String {
        format!(
            "{}/resourceGroups/{}/providers/{}/{}?api-version={}",
            self.subscription_url(),
            resource_group,
            kind,
            name,
            api_version
        )
    }

    fn environment_url(&self, resource_group: &str, name: &str) -> String {
        self.resource_url(
            resource_group,
            "Microsoft.App/managedEnvironments",
            name,
            &self.config.container_apps_api_version,
        )
    }

    fn application_url(&self, resource_group: &str, name: &str, platform: PlatformKind) -> String {
        match platform {
            PlatformKind::ContainerGroup => self.resource_url(
                resource_group,
                "Microsoft.ContainerInstance/containerGroups",
                name,
                &self.config.container_instance_api_version,
            ),
            PlatformKind::ManagedApplication => self.resource_url(
                resource_group,
                "Microsoft.App/containerApps",
                name,
                &self.config.container_apps_api_version,
            ),
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // TRANSPORT
    // ═══════════════════════════════════════════════════════════════

    /// Send with credentials. Non-2xx responses become errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, DeployError> {
        let response = request
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(|e| DeployError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DeployError> {
        let response = self.send(self.http.get(url)).await?;
        response
            .json()
            .await
            .map_err(|e| DeployError::Transport(format!("failed to parse response from {}: {}", url, e)))
    }
}

impl CloudBackend for ArmClient {
    async fn create_or_update_resource_group(
        &self,
        name: &str,
        location: &str,
    ) -> Result<(), DeployError> {
        let body = serde_json::json!({ "location": location });
        self.send(self.http.put(self.resource_group_url(name)).json(&body))
            .await?;
        Ok(())
    }

    async fn begin_delete_resource_group(&self, name: &str) -> Result<Operation, DeployError> {
        let response = self.send(self.http.delete(self.resource_group_url(name))).await?;
        Ok(operation_from(response.status(), response.headers()))
    }

    async fn begin_create_or_update_environment(
        &self,
        resource_group: &str,
        name: &str,
        environment: &ManagedEnvironment,
    ) -> Result<Operation, DeployError> {
        let url = self.environment_url(resource_group, name);
        let response = self.send(self.http.put(url).json(environment)).await?;
        Ok(operation_from(response.status(), response.headers()))
    }

    async fn get_environment(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ManagedEnvironment, DeployError> {
        self.get_json(&self.environment_url(resource_group, name)).await
    }

    async fn begin_create_or_update_application(
        &self,
        resource_group: &str,
        name: &str,
        description: &ResourceDescription,
    ) -> Result<Operation, DeployError> {
        let platform = match description {
            ResourceDescription::ContainerGroup(_) => PlatformKind::ContainerGroup,
            ResourceDescription::ContainerApp(_) => PlatformKind::ManagedApplication,
        };
        let url = self.application_url(resource_group, name, platform);
        let response = self.send(self.http.put(url).json(description)).await?;
        Ok(operation_from(response.status(), response.headers()))
    }

    async fn get_application(
        &self,
        resource_group: &str,
        name: &str,
        platform: PlatformKind,
    ) -> Result<ResourceDescription, DeployError> {
        let url = self.application_url(resource_group, name, platform);
        Ok(match platform {
            PlatformKind::ContainerGroup => {
                ResourceDescription::ContainerGroup(self.get_json::<ContainerGroup>(&url).await?)
            }
            PlatformKind::ManagedApplication => {
                ResourceDescription::ContainerApp(self.get_json::<ContainerApp>(&url).await?)
            }
        })
    }

    async fn begin_delete_application(
        &self,
        resource_group: &str,
        name: &str,
        platform: PlatformKind,
    ) -> Result<Operation, DeployError> {
        let url = self.application_url(resource_group, name, platform);
        let response = self.send(self.http.delete(url)).await?;
        Ok(operation_from(response.status(), response.headers()))
    }

    async fn poll_operation(&self, operation: &PendingOperation) -> Result<OperationState, DeployError> {
        match operation.tracking {
            Tracking::StatusDocument => {
                let status: StatusDocument = self.get_json(&operation.status_url).await?;
                Ok(status.into_state())
            }
            Tracking::Location => {
                let response = self.send(self.http.get(&operation.status_url)).await?;
                Ok(match response.status() {
                    StatusCode::ACCEPTED => OperationState::Running,
                    _ => OperationState::Succeeded,
                })
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// WIRE HELPERS
// ═══════════════════════════════════════════════════════════════════

/// How to follow up on a create or delete response.
///
/// `Azure-AsyncOperation` wins over `Location`. A `Location` header only
/// means "in progress" on a 202.
fn operation_from(status: StatusCode, headers: &HeaderMap) -> Operation {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(status_url) = header(ASYNC_OPERATION_HEADER) {
        return Operation::Pending(PendingOperation {
            status_url,
            tracking: Tracking::StatusDocument,
        });
    }
    if status == StatusCode::ACCEPTED {
        if let Some(status_url) = header(LOCATION.as_str()) {
            return Operation::Pending(PendingOperation {
                status_url,
                tracking: Tracking::Location,
            });
        }
    }
    Operation::Done
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// `{"error":{"code","message"}}` when present, `HttpStatus<n>` otherwise.
async fn error_from_response(response: Response) -> DeployError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(ErrorBody {
        error: Some(detail),
    }) = serde_json::from_str::<ErrorBody>(&body)
    {
        if !detail.code.is_empty() {
            return DeployError::provider(detail.code, detail.message);
        }
    }

    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body
    };
    DeployError::provider(format!("HttpStatus{}", status.as_u16()), message)
}

#[derive(Debug, Deserialize)]
struct StatusDocument {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

impl StatusDocument {
    fn into_state(self) -> OperationState {
        let fault = |fallback: &str, error: Option<ErrorDetail>| {
            let detail = error.unwrap_or(ErrorDetail {
                code: String::new(),
                message: String::new(),
            });
            ProviderFault {
                code: if detail.code.is_empty() {
                    fallback.to_string()
                } else {
                    detail.code
                },
                message: detail.message,
            }
        };

        match self.status.as_str() {
            "Succeeded" => OperationState::Succeeded,
            "Failed" => OperationState::Failed(fault("OperationFailed", self.error)),
            "Canceled" | "Cancelled" => OperationState::Failed(fault("OperationCanceled", self.error)),
            _ => OperationState::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn client() -> ArmClient {
        ArmClient::new("sub-1", AccessToken::new("t"), ClientConfig::default()).unwrap()
    }

    #[test]
    fn test_urls() {
        let client = client();
        assert_eq!(
            client.resource_group_url("preview-acme-shop-pr1"),
            "https://management.azure.com/subscriptions/sub-1/resourcegroups/preview-acme-shop-pr1?api-version=2021-04-01"
        );
        assert_eq!(
            client.application_url("rg", "pv-pr1", PlatformKind::ManagedApplication),
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.App/containerApps/pv-pr1?api-version=2024-03-01"
        );
        assert_eq!(
            client.application_url("rg", "pv-pr1", PlatformKind::ContainerGroup),
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.ContainerInstance/containerGroups/pv-pr1?api-version=2023-05-01"
        );
    }

    #[test]
    fn test_empty_subscription_rejected() {
        let err = ArmClient::new(" ", AccessToken::new("t"), ClientConfig::default()).unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }

    #[test]
    fn test_token_not_printed() {
        let client = client();
        assert!(!format!("{:?}", client).contains("AccessToken(\"t\")"));
        assert_eq!(format!("{:?}", AccessToken::new("secret")), "AccessToken(***)");
    }

    #[test]
    fn test_operation_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(operation_from(StatusCode::OK, &headers), Operation::Done);

        headers.insert(LOCATION, HeaderValue::from_static("https://example/loc"));
        assert_eq!(operation_from(StatusCode::OK, &headers), Operation::Done);
        assert_eq!(
            operation_from(StatusCode::ACCEPTED, &headers),
            Operation::Pending(PendingOperation {
                status_url: "https://example/loc".into(),
                tracking: Tracking::Location,
            })
        );

        headers.insert(
            ASYNC_OPERATION_HEADER,
            HeaderValue::from_static("https://example/op"),
        );
        assert_eq!(
            operation_from(StatusCode::CREATED, &headers),
            Operation::Pending(PendingOperation {
                status_url: "https://example/op".into(),
                tracking: Tracking::StatusDocument,
            })
        );
    }

    #[test]
    fn test_status_document() {
        let doc = |json: &str| serde_json::from_str::<StatusDocument>(json).unwrap().into_state();

        assert_eq!(doc(r#"{"status":"InProgress"}"#), OperationState::Running);
        assert_eq!(doc(r#"{"status":"Succeeded"}"#), OperationState::Succeeded);
        assert_eq!(
            doc(r#"{"status":"Failed","error":{"code":"InvalidParameter","message":"bad port"}}"#),
            OperationState::Failed(ProviderFault {
                code: "InvalidParameter".into(),
                message: "bad port".into(),
            })
        );
        assert!(matches!(
            doc(r#"{"status":"Canceled"}"#),
            OperationState::Failed(ProviderFault { code, .. }) if code == "OperationCanceled"
        ));
    }
}
