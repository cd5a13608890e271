//! Error types for preview environment provisioning.
//!
//! No `anyhow` leakage. Explicit, typed errors.

use std::time::Duration;

/// Provider error codes that can never succeed on retry.
///
/// Matched as substrings of the provider's symbolic code, so derived codes
/// such as `InvalidResourceGroupLocation` are permanent too.
pub const PERMANENT_ERROR_CODES: &[&str] = &[
    "InvalidParameter",
    "InvalidResourceGroup",
    "AuthorizationFailed",
    "InvalidSubscriptionId",
];

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} too long: {len} chars (max {max}): {name}")]
    NameTooLong {
        kind: &'static str,
        name: String,
        len: usize,
        max: usize,
    },

    #[error("{kind} too short: {len} chars (min {min}): {name}")]
    NameTooShort {
        kind: &'static str,
        name: String,
        len: usize,
        min: usize,
    },

    #[error("no deployable services found (all have build configs)")]
    NoDeployableServices,

    #[error("descriptor error: {0}")]
    Descriptor(String),

    #[error("provider returned {code}: {message}")]
    Provider { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{resource} has no ID")]
    MissingResourceId { resource: String },

    #[error("{resource} has no network properties")]
    NoNetworkProperties { resource: String },

    #[error("{resource} has no assigned address")]
    NoAssignedAddress { resource: String },

    #[error("{resource} has no FQDN")]
    NoFqdn { resource: String },

    #[error("{operation}: retry budget of {budget:?} exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        budget: Duration,
        #[source]
        last: Box<DeployError>,
    },

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("status report failed: {0}")]
    Report(String),
}

impl DeployError {
    /// Shorthand for a provider error with a symbolic code.
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        DeployError::Provider {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The provider's symbolic error code, if this error came from the provider.
    pub fn code(&self) -> Option<&str> {
        match self {
            DeployError::Provider { code, .. } => Some(code),
            DeployError::RetryExhausted { last, .. } => last.code(),
            _ => None,
        }
    }

    /// Whether retrying the failed request can never succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            DeployError::Provider { code, .. } => PERMANENT_ERROR_CODES
                .iter()
                .any(|permanent| code.contains(permanent)),
            DeployError::Transport(_)
            | DeployError::MissingResourceId { .. }
            | DeployError::Timeout(_) => false,
            _ => true,
        }
    }

    /// Whether this error might be recoverable by retry.
    pub fn is_transient(&self) -> bool {
        !self.is_permanent()
    }

    /// The innermost error, looking through retry exhaustion.
    pub fn root_cause(&self) -> &DeployError {
        match self {
            DeployError::RetryExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}
