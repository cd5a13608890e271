//! Deployer state machine nodes.
//!
//! `Idle → GroupEnsuring → [EnvironmentEnsuring] → ApplicationSubmitting →
//! ApplicationPolling → Succeeded | RolledBack`. The environment step only
//! exists on the managed-application platform.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeployPhase {
    /// Nothing has been sent to the provider.
    Idle,
    /// Create-or-update of the resource group.
    GroupEnsuring,
    /// Create-or-update of the shared hosting environment.
    EnvironmentEnsuring,
    /// Create-or-update of the application resource.
    ApplicationSubmitting,
    /// Waiting for the application's long-running operation.
    ApplicationPolling,
    /// Endpoint extracted. Rollback suppressed.
    Succeeded,
    /// A step after group creation failed and the group was deleted.
    RolledBack,
}

impl DeployPhase {
    /// Human-readable phase name for logging/display.
    pub fn name(&self) -> &'static str {
        match self {
            DeployPhase::Idle => "idle",
            DeployPhase::GroupEnsuring => "group_ensuring",
            DeployPhase::EnvironmentEnsuring => "environment_ensuring",
            DeployPhase::ApplicationSubmitting => "application_submitting",
            DeployPhase::ApplicationPolling => "application_polling",
            DeployPhase::Succeeded => "succeeded",
            DeployPhase::RolledBack => "rolled_back",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployPhase::Succeeded | DeployPhase::RolledBack)
    }

    /// Whether a failure in this phase leaves a resource group behind.
    pub fn requires_rollback(&self) -> bool {
        matches!(
            self,
            DeployPhase::EnvironmentEnsuring
                | DeployPhase::ApplicationSubmitting
                | DeployPhase::ApplicationPolling
        )
    }
}
