//! Tamper-evident audit trail for the AAC billing engine
//!
//! The audit engine subscribes to `billing.*` events on the event bus and
//! appends one [`AuditEntry`] per event to an append-only trail. Each entry
//! carries the SHA-256 of its predecessor, so any edit or removal inside the
//! trail is detected by [`AuditTrail::verify_integrity`].
//!
//! Entries are keyed by subject (the patient identifier carried in the event
//! payload, or `system`) so a compliance reviewer can pull every billing action
//! taken for one patient.
//!
//! # Example
//!
//! ```rust
//! use audit_engine::AuditEngine;
//! use events_bus::{DomainEvent, EventBus};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = EventBus::default();
//! let engine = AuditEngine::new();
//!
//! let event = bus.publish(DomainEvent::new(
//!     "billing.claim.created",
//!     json!({"patientId": "patient-7", "claimId": "c-1", "amount": "150.00"}),
//! ))?;
//! engine.record(&event);
//!
//! assert_eq!(engine.trail().by_subject("patient-7").len(), 1);
//! engine.trail().verify_integrity()?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod entry;
pub mod error;
pub mod trail;

pub use engine::*;
pub use entry::*;
pub use error::*;
pub use trail::*;
