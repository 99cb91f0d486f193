use tokio::sync::mpsc;
use tracing::{info, warn};

use super::events::{DecisionEnvelope, DecisionEvent};

/// Receives the decisions of each search.
///
/// Called inline from the cascade, so implementations must not block.
pub trait DecisionObserver: Send + Sync {
    fn observe(&self, envelope: &DecisionEnvelope);
}

/// Logs each decision through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DecisionObserver for TracingObserver {
    fn observe(&self, envelope: &DecisionEnvelope) {
        let request_id = envelope.request_id;
        match &envelope.event {
            DecisionEvent::ImageFused { query, .. } => {
                info!(%request_id, "Image fused into query: {}", query);
            }
            DecisionEvent::CourseResolved { course, tier } => {
                info!(%request_id, ?tier, "Selected course: {}", course);
            }
            DecisionEvent::ModulesResolved {
                modules,
                fallback_used,
            } => {
                info!(%request_id, fallback_used, "Selected modules: {:?}", modules);
            }
            DecisionEvent::ResourcesRanked {
                module,
                count,
                fallback_used,
            } => {
                info!(%request_id, fallback_used, "Ranked {} resources in {}", count, module);
            }
            DecisionEvent::CollaboratorFailed { stage, error } => {
                warn!(%request_id, %stage, "Collaborator failed: {}", error);
            }
            DecisionEvent::SearchFinished { outcome, count } => {
                info!(%request_id, outcome = outcome.as_str(), count, "Search finished");
            }
        }
    }
}

/// Forwards decisions to a channel without waiting.
///
/// Cheaply cloneable. A full or closed channel drops the event and logs.
#[derive(Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<DecisionEnvelope>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<DecisionEnvelope>) -> Self {
        Self { tx }
    }
}

impl DecisionObserver for ChannelObserver {
    fn observe(&self, envelope: &DecisionEnvelope) {
        if let Err(e) = self.tx.try_send(envelope.clone()) {
            tracing::error!("Failed to forward decision event: {}", e);
        }
    }
}
