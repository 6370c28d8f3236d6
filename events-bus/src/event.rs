// Event types and structures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub topic: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Event as produced by a domain service, before the bus stamps it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub topic: String,
    pub data: serde_json::Value,
}

impl DomainEvent {
    pub fn new(topic: &str, data: serde_json::Value) -> Self {
        Self {
            topic: topic.to_string(),
            data,
        }
    }

    /// Build an event from any serializable payload
    pub fn from_payload<T: Serialize>(topic: &str, payload: &T) -> crate::error::Result<Self> {
        Ok(Self::new(topic, serde_json::to_value(payload)?))
    }

    pub(crate) fn into_event(self) -> Event {
        Event {
            id: Uuid::new_v4(),
            topic: self.topic,
            data: self.data,
            timestamp: Utc::now(),
        }
    }
}

impl Event {
    /// String field of the payload, if present
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(serde_json::Value::as_str)
    }
}
