//! Deployment events and the observer they are delivered to.
//!
//! Orchestration code never logs directly. It emits [`DeployEvent`]s to an
//! injected [`DeployObserver`]; the binary plugs in [`TracingObserver`],
//! tests plug in [`RecordingObserver`] and assert on what was emitted.

use crate::state::DeployPhase;
use std::sync::Mutex;
use std::time::Duration;

/// Something worth knowing happened during a deploy or teardown.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    /// The deployer moved to a new phase.
    Phase {
        resource_group: String,
        phase: DeployPhase,
    },
    /// A transient failure; the operation runs again after `delay`.
    RetryScheduled {
        operation: String,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    /// A permanent failure; no further attempts.
    PermanentFailure { operation: String, error: String },
    /// A build-only service was left out of the deployment.
    ServiceSkipped { service: String },
    /// The DNS label fell back to its short, collision-prone form.
    DnsLabelShortened { label: String },
    RollbackStarted { resource_group: String, reason: String },
    /// Rollback failed. Logged, never escalated.
    RollbackFailed { resource_group: String, error: String },
    Deployed { resource_group: String, endpoint: String },
    TornDown { resource_group: String },
    /// The status reporter failed. The outcome is unaffected.
    ReportFailed { error: String },
}

/// Receives deployment events.
pub trait DeployObserver: Send + Sync {
    fn on_event(&self, event: &DeployEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DeployObserver for TracingObserver {
    fn on_event(&self, event: &DeployEvent) {
        match event {
            DeployEvent::Phase {
                resource_group,
                phase,
            } => tracing::debug!(%resource_group, phase = phase.name(), "phase changed"),
            DeployEvent::RetryScheduled {
                operation,
                attempt,
                delay,
                error,
            } => tracing::warn!(
                %operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                %error,
                "operation failed, retrying"
            ),
            DeployEvent::PermanentFailure { operation, error } => {
                tracing::error!(%operation, %error, "permanent failure, not retrying")
            }
            DeployEvent::ServiceSkipped { service } => {
                tracing::info!(%service, "skipping service with build config")
            }
            DeployEvent::DnsLabelShortened { label } => tracing::warn!(
                %label,
                "DNS label exceeded 63 chars; using short form that may collide across repositories"
            ),
            DeployEvent::RollbackStarted {
                resource_group,
                reason,
            } => tracing::warn!(%resource_group, %reason, "deployment failed, attempting cleanup"),
            DeployEvent::RollbackFailed {
                resource_group,
                error,
            } => tracing::error!(%resource_group, %error, "failed to cleanup resource group"),
            DeployEvent::Deployed {
                resource_group,
                endpoint,
            } => tracing::info!(%resource_group, %endpoint, "deployment complete"),
            DeployEvent::TornDown { resource_group } => {
                tracing::info!(%resource_group, "teardown complete")
            }
            DeployEvent::ReportFailed { error } => {
                tracing::warn!(%error, "failed to report status")
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DeployEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<DeployEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Phases entered, in order.
    pub fn phases(&self) -> Vec<DeployPhase> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DeployEvent::Phase { phase, .. } => Some(phase),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&DeployEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}

impl DeployObserver for RecordingObserver {
    fn on_event(&self, event: &DeployEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fan out to several observers.
impl<A: DeployObserver, B: DeployObserver> DeployObserver for (A, B) {
    fn on_event(&self, event: &DeployEvent) {
        self.0.on_event(event);
        self.1.on_event(event);
    }
}
