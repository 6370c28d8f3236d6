//! Operator CLI for the AAC billing engine
//!
//! `aacbill` works directly against the configured billing store (normally
//! the SQLite file) for back-office tasks that do not belong in the therapy
//! app itself:
//!
//! - **report**: financial report for a date-of-service window, as JSON
//! - **export**: JSON backup or CSV claim summary
//! - **import**: load a JSON backup
//! - **auth-status**: authorization units and warnings for one patient
//!
//! # Example Usage
//!
//! ```bash
//! aacbill --config aacbill.yaml report --start 2024-01-01 --end 2024-03-31
//! aacbill export --format csv --output claims.csv
//! aacbill import backup-20240401.json
//! aacbill --database /var/lib/aac/billing.db auth-status patient-0042
//! ```
//!
//! Configuration follows the engine's layering: defaults, then the optional
//! `--config` file, then `AACBILL_` environment variables
//! (`AACBILL_STORAGE__SQLITE_PATH=/tmp/billing.db`).

pub mod cli;
pub mod commands;

pub use cli::*;
pub use commands::*;
