//! Insurance domain for AAC therapy billing
//!
//! Provides the patient-side insurance model the billing engine works against:
//! - Billing profiles with insurance coverage and running balance
//! - Prior authorizations and their unit consumption rules
//! - Resolution of the authorization applicable to a service date
//! - Authorization status checks with near-limit warnings
//! - Coverage eligibility by effective/termination date
//!
//! Nothing in this crate performs I/O; storage and locking belong to the
//! billing service that owns the profiles.

pub mod authorization;
pub mod eligibility;
pub mod error;
pub mod models;

pub use authorization::*;
pub use eligibility::*;
pub use error::*;
pub use models::*;
