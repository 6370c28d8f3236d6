//! Insurance claims and authorization billing engine for AAC therapy
//!
//! Turns completed therapy sessions into insurance claims and follows them
//! through the payer lifecycle:
//! - CPT catalog pricing of sessions, with modifier and timed-unit rules
//! - Authorization unit consumption, serialized per patient
//! - Claim lifecycle (draft, submitted, processing, paid, denied, appealed)
//! - Payment reconciliation against the patient balance
//! - Summary, insurer, patient, aging and projection reporting
//! - JSON and CSV export, JSON import
//!
//! Storage, the clearinghouse and the session feed sit behind traits so the
//! engine runs the same against the in-memory store in tests and SQLite in
//! the operator tooling.

pub mod catalog;
pub mod claims;
pub mod clearinghouse;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod locks;
pub mod models;
pub mod profiles;
pub mod reporting;
pub mod repository;
pub mod service;
pub mod sessions;

pub use catalog::*;
pub use claims::*;
pub use clearinghouse::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use export::*;
pub use locks::*;
pub use models::*;
pub use profiles::*;
pub use reporting::*;
pub use repository::*;
pub use service::*;
pub use sessions::*;
