//! Layered configuration loading for the AAC billing engine
//!
//! Configuration is resolved from three layers, later layers winning:
//!
//! 1. Serde defaults of the target type (`Default` impl)
//! 2. An optional YAML or TOML file, chosen by extension
//! 3. Environment variables with a prefix, `__` separating nested keys
//!
//! After extraction the [`Validate`] hook runs, so an out-of-range threshold is
//! rejected at startup instead of surfacing as odd billing behaviour later.
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::{ConfigLoader, Validate};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct AppConfig {
//!     log_level: String,
//! }
//!
//! impl Validate for AppConfig {}
//!
//! let config: AppConfig = ConfigLoader::new()
//!     .with_file("aacbill.yaml")
//!     .with_env_prefix("AACBILL_")
//!     .load()?;
//! # Ok::<(), config_engine::ConfigError>(())
//! ```

pub mod engine;
pub mod error;
pub mod validation;

pub use engine::*;
pub use error::*;
pub use validation::*;
