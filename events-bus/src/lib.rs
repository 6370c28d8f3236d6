//! In-process domain event bus for the AAC billing engine
//!
//! Billing operations publish [`DomainEvent`]s (claim created, payment processed,
//! authorization near its limit, ...) and collaborators such as the audit trail
//! or an analytics exporter subscribe by topic pattern.
//!
//! The bus is a `tokio::sync::broadcast` channel: publishing never blocks, every
//! subscriber sees every event published after it subscribed, and a subscriber
//! that falls more than `capacity` events behind skips the overflow (logged).
//!
//! # Topic patterns
//!
//! Topics are dot-separated (`billing.claim.created`). A `*` segment matches one
//! segment, and a trailing `*` matches one or more remaining segments, so
//! `billing.*` sees every billing event and `billing.claim.*` only claim events.
//!
//! # Example
//!
//! ```rust
//! use events_bus::{DomainEvent, EventBus};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), events_bus::EventBusError> {
//! let bus = EventBus::new(64);
//! let mut subscription = bus.subscribe("billing.claim.*")?;
//!
//! bus.publish(DomainEvent::new("billing.claim.created", json!({"claimId": "c-1"})))?;
//!
//! let event = subscription.next().await.expect("event delivered");
//! assert_eq!(event.topic, "billing.claim.created");
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod error;
pub mod event;
pub mod subscriber;

pub use bus::*;
pub use error::*;
pub use event::*;
pub use subscriber::*;
