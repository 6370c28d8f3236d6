// Audit entry types and structures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hash of the (virtual) entry before the first one
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Source event topic, e.g. `billing.claim.created`
    pub event_type: String,
    /// Patient identifier, or `system`
    pub subject: String,
    pub action: String,
    pub data: serde_json::Value,
    pub previous_hash: String,
    pub hash: String,
}

impl AuditEntry {
    /// Hash over every field except `hash` itself
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update(self.event_type.as_bytes());
        hasher.update(self.subject.as_bytes());
        hasher.update(self.action.as_bytes());
        hasher.update(self.data.to_string().as_bytes());
        hasher.update(self.previous_hash.as_bytes());
        hex::encode(hasher.finalize())
    }
}
