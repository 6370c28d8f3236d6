use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Invalid topic pattern: {0}")]
    InvalidPattern(String),

    #[error("Event serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EventBusError>;
