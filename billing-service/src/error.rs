use chrono::{DateTime, Utc};
use error_common::{codes, Classify, ErrorCode, ErrorKind};
use insurance_service::InsuranceError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("No billing profile on file for this patient")]
    NoProfile { patient_id: String },

    #[error("None of the {requested} requested sessions are billable")]
    NoBillableSessions { requested: usize },

    #[error("No applicable authorization for service date {}", service_date.format("%Y-%m-%d"))]
    NoAuthorization { service_date: DateTime<Utc> },

    #[error("Authorization {authorization_number} has {remaining} units remaining but the claim needs {needed}")]
    InsufficientUnits {
        authorization_number: String,
        remaining: u32,
        needed: u32,
    },

    #[error("Claim {0} not found")]
    ClaimNotFound(Uuid),

    #[error("Claim {0} is paid and can no longer change")]
    ClaimImmutable(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Clearinghouse error: {0}")]
    Clearinghouse(#[from] crate::clearinghouse::ClearinghouseError),

    #[error("Insurance error: {0}")]
    Insurance(#[from] InsuranceError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl BillingError {
    /// Routine guard failures the caller is expected to surface as a message
    pub fn is_precondition_failure(&self) -> bool {
        self.kind() == ErrorKind::PreconditionNotMet
    }
}

impl Classify for BillingError {
    fn error_code(&self) -> ErrorCode {
        use ErrorKind::*;
        match self {
            BillingError::NoProfile { .. } => ErrorCode::new(codes::billing::NO_PROFILE, PreconditionNotMet),
            BillingError::NoBillableSessions { .. } => {
                ErrorCode::new(codes::billing::NO_BILLABLE_SESSIONS, PreconditionNotMet)
            }
            BillingError::NoAuthorization { .. } => ErrorCode::new(codes::billing::NO_AUTHORIZATION, PreconditionNotMet),
            BillingError::InsufficientUnits { .. } => {
                ErrorCode::new(codes::billing::INSUFFICIENT_UNITS, PreconditionNotMet)
            }
            BillingError::ClaimNotFound(_) => ErrorCode::new(codes::billing::CLAIM_NOT_FOUND, NotFound),
            BillingError::ClaimImmutable(_) => ErrorCode::new(codes::billing::CLAIM_IMMUTABLE, Conflict),
            BillingError::Validation(_) => ErrorCode::new(codes::validation::INVALID_INPUT, Validation),
            BillingError::Clearinghouse(_) => ErrorCode::new(codes::billing::CLEARINGHOUSE_FAILURE, ExternalSystem),
            BillingError::Insurance(InsuranceError::InvalidProfile(_) | InsuranceError::InvalidAuthorization { .. }) => {
                ErrorCode::new(codes::validation::INVALID_PROFILE, Validation)
            }
            BillingError::Insurance(_) => ErrorCode::new(codes::billing::NO_AUTHORIZATION, PreconditionNotMet),
            BillingError::Storage(_) => ErrorCode::new(codes::storage::BACKEND_FAILURE, Storage),
            BillingError::Export(_) => ErrorCode::new(codes::billing::EXPORT_FAILED, Internal),
        }
    }
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        BillingError::Storage(err.to_string())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
