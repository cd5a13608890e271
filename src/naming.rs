//! Deterministic provider-safe names for a pull request's environment.
//!
//! Re-running the same PR event must land on the same names, so every
//! function here is pure.

use crate::error::DeployError;
use serde::{Deserialize, Serialize};

pub const RESOURCE_GROUP_PREFIX: &str = "preview";
pub const DNS_LABEL_PREFIX: &str = "pv";

/// Azure resource group names are limited to 90 characters.
pub const MAX_RESOURCE_GROUP_LEN: usize = 90;
/// RFC 1035 label limit.
pub const MAX_DNS_LABEL_LEN: usize = 63;
pub const MIN_DNS_LABEL_LEN: usize = 3;

/// Repository and pull request a preview environment belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentIdentity {
    pub owner: String,
    pub repository: String,
    pub pull_request: u64,
}

impl EnvironmentIdentity {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        pull_request: u64,
    ) -> Result<Self, DeployError> {
        let identity = Self {
            owner: owner.into(),
            repository: repository.into(),
            pull_request,
        };
        if identity.owner.is_empty() {
            return Err(DeployError::Validation("repository owner is empty".into()));
        }
        if identity.repository.is_empty() {
            return Err(DeployError::Validation("repository name is empty".into()));
        }
        if identity.pull_request == 0 {
            return Err(DeployError::Validation("pull request number is 0".into()));
        }
        Ok(identity)
    }
}

impl std::fmt::Display for EnvironmentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repository, self.pull_request)
    }
}

/// All generated names for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentNames {
    pub resource_group: String,
    pub dns_label: String,
    pub application: String,
    /// The DNS label fell back to `<prefix>-pr<N>` and no longer encodes the
    /// repository. Two repositories with the same PR number collide.
    pub dns_label_shortened: bool,
}

impl EnvironmentNames {
    pub fn derive(identity: &EnvironmentIdentity) -> Result<Self, DeployError> {
        let resource_group = resource_group_name(identity)?;
        let (dns_label, dns_label_shortened) = dns_label_with_fallback(identity)?;
        Ok(Self {
            resource_group,
            dns_label,
            application: application_name(identity),
            dns_label_shortened,
        })
    }
}

/// `preview-<owner>-<repo>-pr<N>`, with characters outside `[A-Za-z0-9_.-]`
/// replaced by `-`.
///
/// Never truncates: an over-long name is a configuration error.
pub fn resource_group_name(identity: &EnvironmentIdentity) -> Result<String, DeployError> {
    let owner = sanitize(&identity.owner, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
    });
    let repo = sanitize(&identity.repository, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
    });

    let name = format!(
        "{}-{}-{}-pr{}",
        RESOURCE_GROUP_PREFIX, owner, repo, identity.pull_request
    );
    if name.len() > MAX_RESOURCE_GROUP_LEN {
        return Err(DeployError::NameTooLong {
            kind: "resource group name",
            len: name.len(),
            name,
            max: MAX_RESOURCE_GROUP_LEN,
        });
    }
    Ok(name)
}

/// `pv-<owner>-<repo>-pr<N>` lowercased, restricted to `[a-z0-9-]`.
pub fn dns_label(identity: &EnvironmentIdentity) -> Result<String, DeployError> {
    dns_label_with_fallback(identity).map(|(label, _)| label)
}

fn dns_label_with_fallback(identity: &EnvironmentIdentity) -> Result<(String, bool), DeployError> {
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
    let owner = sanitize(&identity.owner.to_lowercase(), allowed);
    let repo = sanitize(&identity.repository.to_lowercase(), allowed);

    let label = format!(
        "{}-{}-{}-pr{}",
        DNS_LABEL_PREFIX, owner, repo, identity.pull_request
    );
    let label = label.trim_matches('-').to_string();

    if label.len() < MIN_DNS_LABEL_LEN {
        return Err(DeployError::NameTooShort {
            kind: "DNS label",
            len: label.len(),
            name: label,
            min: MIN_DNS_LABEL_LEN,
        });
    }
    if label.len() > MAX_DNS_LABEL_LEN {
        return Ok((short_label(identity), true));
    }
    Ok((label, false))
}

/// Application resource name: `pv-pr<N>`.
pub fn application_name(identity: &EnvironmentIdentity) -> String {
    short_label(identity)
}

fn short_label(identity: &EnvironmentIdentity) -> String {
    format!("{}-pr{}", DNS_LABEL_PREFIX, identity.pull_request)
}

fn sanitize(input: &str, allowed: impl Fn(char) -> bool) -> String {
    input
        .chars()
        .map(|c| if allowed(c) { c } else { '-' })
        .collect()
}
