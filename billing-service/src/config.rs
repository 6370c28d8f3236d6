use config_engine::{ensure, Validate};
use insurance_service::AuthorizationThresholds;
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration of the billing engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub authorization: AuthorizationThresholds,
    pub projection: ProjectionConfig,
    pub clearinghouse: ClearinghouseConfig,
    pub storage: StorageConfig,
    pub events: EventsConfig,
    pub logging: LoggerConfig,
}

/// Forward revenue projection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Share of unpaid billed amounts expected to be collected, in percent
    pub expected_collection_percent: u32,
    /// Trailing window, in days, the projection is based on
    pub window_days: i64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            expected_collection_percent: 80,
            window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearinghouseConfig {
    /// Artificial latency of the simulated clearinghouse
    pub submission_delay_ms: u64,
    pub claim_number_prefix: String,
}

impl Default for ClearinghouseConfig {
    fn default() -> Self {
        Self {
            submission_delay_ms: 0,
            claim_number_prefix: "CLM".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub sqlite_path: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            sqlite_path: "aac_billing.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: events_bus::DEFAULT_CAPACITY,
        }
    }
}

impl Validate for BillingConfig {
    fn validate(&self) -> config_engine::Result<()> {
        ensure(
            self.projection.expected_collection_percent <= 100,
            "projection.expected_collection_percent must be between 0 and 100",
        )?;
        ensure(self.projection.window_days > 0, "projection.window_days must be positive")?;
        ensure(
            self.authorization.expiry_warning_days >= 0,
            "authorization.expiry_warning_days must not be negative",
        )?;
        ensure(self.events.capacity > 0, "events.capacity must be positive")?;
        ensure(self.storage.max_connections > 0, "storage.max_connections must be positive")?;
        ensure(
            self.storage.backend != StorageBackend::Sqlite || !self.storage.sqlite_path.trim().is_empty(),
            "storage.sqlite_path is required for the sqlite backend",
        )?;
        Ok(())
    }
}
