use crate::{entry::AuditEntry, error::Result, trail::AuditTrail};
use events_bus::{Event, EventBus};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Topic pattern the engine listens on when attached to a bus
pub const AUDITED_TOPICS: &str = "billing.*";

const SYSTEM_SUBJECT: &str = "system";

/// Records billing events into an [`AuditTrail`]
#[derive(Debug, Clone, Default)]
pub struct AuditEngine {
    trail: Arc<AuditTrail>,
}

impl AuditEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trail(&self) -> &AuditTrail {
        &self.trail
    }

    /// Append one entry for `event`
    pub fn record(&self, event: &Event) -> AuditEntry {
        let subject = event.data_str("patientId").unwrap_or(SYSTEM_SUBJECT);
        let action = event
            .topic
            .strip_prefix("billing.")
            .unwrap_or(&event.topic);

        let entry = self
            .trail
            .append(&event.topic, subject, action, event.data.clone(), event.timestamp);
        debug!(
            sequence = entry.sequence,
            event_type = %entry.event_type,
            "Audit entry recorded"
        );
        entry
    }

    /// Subscribe to the bus and record every billing event until the bus closes
    pub fn attach(&self, bus: &EventBus) -> Result<JoinHandle<()>> {
        let mut subscription = bus.subscribe(AUDITED_TOPICS)?;
        let engine = self.clone();

        info!(topics = AUDITED_TOPICS, "Audit engine attached to event bus");
        Ok(tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                engine.record(&event);
            }
            debug!("Audit engine subscription closed");
        }))
    }
}
