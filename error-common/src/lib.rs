//! Common error handling utilities for the AAC billing engine
//!
//! Every service crate keeps its own `thiserror` enum, but maps each variant onto
//! a stable [`ErrorCode`] and an [`ErrorKind`] from this crate. Callers such as
//! the operator CLI or an HTTP layer branch on the kind and surface the code,
//! so office staff get an actionable message instead of a crash.
//!
//! # Error Categories
//!
//! - **PreconditionNotMet**: a routine business guard failed (no profile, no
//!   authorization, nothing billable). Reported, never escalated.
//! - **Validation**: caller-supplied data violates an integrity rule.
//! - **Conflict**: the requested mutation would break an invariant of stored data.
//! - **NotFound**: the referenced record does not exist.
//! - **ExternalSystem**: a collaborator (clearinghouse, event broker) failed.
//! - **Storage**: the system of record failed.
//! - **Internal**: anything else.
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, ErrorCode, ErrorKind};
//!
//! let code = ErrorCode::new(codes::billing::NO_AUTHORIZATION, ErrorKind::PreconditionNotMet);
//! assert!(code.kind.is_soft_failure());
//! assert_eq!(code.to_string(), "BILLING_1003");
//! ```

pub mod codes;
pub mod types;

pub use types::*;
