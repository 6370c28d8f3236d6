//! Logging setup for healthcare billing with PHI redaction
//!
//! The billing engine logs through `tracing`. This crate installs the global
//! subscriber and provides the helpers used to keep protected health
//! information out of log lines:
//!
//! - **Identifier hashing**: patient, subscriber and policy identifiers are
//!   logged as short SHA-256 correlation tokens via [`hash_identifier`]
//! - **Free-text redaction**: [`PiiRedactor`] scrubs emails, phone numbers,
//!   SSNs and member numbers from messages that originate outside the engine
//!   (clearinghouse errors, denial reasons)
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_logging, LoggerConfig, hash_identifier};
//!
//! init_logging(&LoggerConfig::default()).ok();
//! tracing::info!(patient = %hash_identifier("patient-0042"), "Claim created");
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static REDACTION_ENABLED: AtomicBool = AtomicBool::new(true);

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Global subscriber already installed")]
    AlreadyInitialized,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`.
pub fn init_logging(config: &LoggerConfig) -> Result<(), LoggerError> {
    REDACTION_ENABLED.store(config.redaction_enabled, Ordering::Relaxed);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|_| LoggerError::InvalidFilter(config.log_level.clone()))?,
    };

    // stdout is left to command output
    let layer = fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry.with(layer.json().with_current_span(false)).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(layer.compact().with_target(true)).try_init(),
    };

    result.map_err(|_| LoggerError::AlreadyInitialized)
}

/// Correlation token for an identifier that must not appear in logs.
///
/// Returns the identifier unchanged when redaction was disabled at init time.
pub fn hash_identifier(value: &str) -> String {
    if REDACTION_ENABLED.load(Ordering::Relaxed) {
        format!("id:{}", redactor::digest(value))
    } else {
        value.to_string()
    }
}
