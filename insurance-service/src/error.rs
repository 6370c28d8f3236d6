use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsuranceError {
    #[error("Invalid billing profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid authorization {id}: {reason}")]
    InvalidAuthorization { id: Uuid, reason: String },

    #[error("Authorization {0} is not active")]
    AuthorizationNotActive(Uuid),

    #[error("Authorization {id} has {remaining} units remaining, {requested} requested")]
    UnitsExceeded { id: Uuid, requested: u32, remaining: u32 },
}

pub type InsuranceResult<T> = Result<T, InsuranceError>;
