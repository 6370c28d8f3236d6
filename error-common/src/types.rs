use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a failure, independent of the crate that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PreconditionNotMet,
    Validation,
    Conflict,
    NotFound,
    ExternalSystem,
    Storage,
    Internal,
}

impl ErrorKind {
    /// Soft failures are routine outcomes the caller is expected to branch on.
    pub fn is_soft_failure(self) -> bool {
        matches!(self, ErrorKind::PreconditionNotMet | ErrorKind::ExternalSystem)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::PreconditionNotMet => "precondition_not_met",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ExternalSystem => "external_system",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable, machine-readable code attached to a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode {
    pub code: &'static str,
    pub kind: ErrorKind,
}

impl ErrorCode {
    pub const fn new(code: &'static str, kind: ErrorKind) -> Self {
        Self { code, kind }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

/// Implemented by every service error so callers can classify failures uniformly
pub trait Classify {
    fn error_code(&self) -> ErrorCode;

    fn kind(&self) -> ErrorKind {
        self.error_code().kind
    }
}

/// Log a classified failure at a level matching its kind
pub fn log_failure<E>(context: &str, error: &E)
where
    E: Classify + fmt::Display,
{
    let code = error.error_code();
    if code.kind.is_soft_failure() {
        tracing::warn!(
            context = context,
            error_code = %code,
            error_kind = %code.kind,
            "{}",
            error
        );
    } else {
        tracing::error!(
            context = context,
            error_code = %code,
            error_kind = %code.kind,
            "{}",
            error
        );
    }
}
