use crate::{
    entry::{AuditEntry, GENESIS_HASH},
    error::{AuditError, Result},
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// Append-only, hash-chained list of audit entries
#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &self,
        event_type: &str,
        subject: &str,
        action: &str,
        data: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> AuditEntry {
        let mut entries = self.entries.write();
        let previous_hash = entries
            .last()
            .map_or_else(|| GENESIS_HASH.to_string(), |last| last.hash.clone());

        let mut entry = AuditEntry {
            id: Uuid::new_v4(),
            sequence: entries.len() as u64,
            timestamp,
            event_type: event_type.to_string(),
            subject: subject.to_string(),
            action: action.to_string(),
            data,
            previous_hash,
            hash: String::new(),
        };
        entry.hash = entry.compute_hash();
        entries.push(entry.clone());
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    pub fn by_subject(&self, subject: &str) -> Vec<AuditEntry> {
        self.filter(|entry| entry.subject == subject)
    }

    pub fn by_event_type(&self, event_type: &str) -> Vec<AuditEntry> {
        self.filter(|entry| entry.event_type == event_type)
    }

    pub fn since(&self, from: DateTime<Utc>) -> Vec<AuditEntry> {
        self.filter(|entry| entry.timestamp >= from)
    }

    fn filter(&self, predicate: impl Fn(&AuditEntry) -> bool) -> Vec<AuditEntry> {
        self.entries.read().iter().filter(|entry| predicate(entry)).cloned().collect()
    }

    /// Recompute the hash chain and report the first broken link
    pub fn verify_integrity(&self) -> Result<()> {
        let entries = self.entries.read();
        let mut expected_previous = GENESIS_HASH.to_string();

        for (index, entry) in entries.iter().enumerate() {
            if entry.sequence != index as u64
                || entry.previous_hash != expected_previous
                || entry.hash != entry.compute_hash()
            {
                return Err(AuditError::IntegrityCheckError { sequence: index as u64 });
            }
            expected_previous = entry.hash.clone();
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, index: usize, data: serde_json::Value) {
        if let Some(entry) = self.entries.write().get_mut(index) {
            entry.data = data;
        }
    }
}
