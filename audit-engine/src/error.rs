use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit trail integrity check failed at entry {sequence}")]
    IntegrityCheckError { sequence: u64 },

    #[error("Audit subscription failed: {0}")]
    SubscriptionError(#[from] events_bus::EventBusError),

    #[error("Audit entry serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;
