//! The cloud control-plane trait: CloudBackend
//!
//! Everything the deployer needs from the provider goes through here. The
//! deployer itself is pure orchestration; HTTP, authentication and
//! long-running-operation headers belong to implementations.

use crate::error::DeployError;
use crate::platform::PlatformKind;
use crate::resource::{ManagedEnvironment, ResourceDescription};
use crate::types::{Operation, OperationState, PendingOperation};
use std::future::Future;

/// Provider control plane, scoped to one subscription.
///
/// Create calls are create-or-update: issuing one twice with the same input
/// converges to the same resource, so they are safe to retry.
pub trait CloudBackend: Send + Sync {
    // ═══════════════════════════════════════════════════════════════
    // RESOURCE GROUPS
    // ═══════════════════════════════════════════════════════════════

    /// Create the group, or update it in place. Synchronous on the provider.
    fn create_or_update_resource_group(
        &self,
        name: &str,
        location: &str,
    ) -> impl Future<Output = Result<(), DeployError>> + Send;

    /// Start deleting the group and everything in it.
    fn begin_delete_resource_group(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Operation, DeployError>> + Send;

    // ═══════════════════════════════════════════════════════════════
    // HOSTING ENVIRONMENT (managed-application platform only)
    // ═══════════════════════════════════════════════════════════════

    fn begin_create_or_update_environment(
        &self,
        resource_group: &str,
        name: &str,
        environment: &ManagedEnvironment,
    ) -> impl Future<Output = Result<Operation, DeployError>> + Send;

    fn get_environment(
        &self,
        resource_group: &str,
        name: &str,
    ) -> impl Future<Output = Result<ManagedEnvironment, DeployError>> + Send;

    // ═══════════════════════════════════════════════════════════════
    // APPLICATION
    // ═══════════════════════════════════════════════════════════════

    /// Submit the translated application. The platform is implied by the
    /// description's variant.
    fn begin_create_or_update_application(
        &self,
        resource_group: &str,
        name: &str,
        description: &ResourceDescription,
    ) -> impl Future<Output = Result<Operation, DeployError>> + Send;

    /// Read back the provisioned application, including its endpoint.
    fn get_application(
        &self,
        resource_group: &str,
        name: &str,
        platform: PlatformKind,
    ) -> impl Future<Output = Result<ResourceDescription, DeployError>> + Send;

    fn begin_delete_application(
        &self,
        resource_group: &str,
        name: &str,
        platform: PlatformKind,
    ) -> impl Future<Output = Result<Operation, DeployError>> + Send;

    // ═══════════════════════════════════════════════════════════════
    // LONG-RUNNING OPERATIONS
    // ═══════════════════════════════════════════════════════════════

    /// Check an in-flight operation once.
    fn poll_operation(
        &self,
        operation: &PendingOperation,
    ) -> impl Future<Output = Result<OperationState, DeployError>> + Send;
}
