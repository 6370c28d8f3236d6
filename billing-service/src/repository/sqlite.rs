//! SQLite-backed billing repository
//!
//! Profiles and claims are stored as JSON documents next to the columns the
//! engine filters on. Claims keep insertion order through the table rowid,
//! which an upsert leaves untouched. Writes from this process are serialized
//! so a commit never has to upgrade a read transaction.

use crate::{
    error::{BillingError, BillingResult},
    models::Claim,
    repository::{ensure_mutable, BillingRepository, BillingSnapshot, ChangeSet},
};
use async_trait::async_trait;
use chrono::Utc;
use insurance_service::BillingProfile;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

pub struct SqliteBillingRepository {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SqliteBillingRepository {
    /// Open (creating if needed) the database file at `path`
    pub async fn connect(path: &str, max_connections: u32) -> BillingResult<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

        let repository = Self::from_pool(pool).await?;
        info!(path = %path, "Opened SQLite billing store");
        Ok(repository)
    }

    pub async fn from_pool(pool: SqlitePool) -> BillingResult<Self> {
        let repository = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        repository.initialize_schema().await?;
        Ok(repository)
    }

    async fn initialize_schema(&self) -> BillingResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS billing_profiles (
                patient_id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS billing_claims (
                id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL,
                status TEXT NOT NULL,
                date_of_service TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_billing_claims_patient ON billing_claims(patient_id)")
            .execute(&self.pool)
            .await?;

        debug!("Billing schema initialized");
        Ok(())
    }

    fn claims_from_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> BillingResult<Vec<Claim>> {
        rows.iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                decode(&data)
            })
            .collect()
    }
}

fn encode<T: Serialize>(value: &T) -> BillingResult<String> {
    serde_json::to_string(value).map_err(|e| BillingError::Storage(format!("Failed to encode record: {}", e)))
}

fn decode<T: DeserializeOwned>(data: &str) -> BillingResult<T> {
    serde_json::from_str(data).map_err(|e| BillingError::Storage(format!("Corrupt stored record: {}", e)))
}

#[async_trait]
impl BillingRepository for SqliteBillingRepository {
    async fn get_profile(&self, patient_id: &str) -> BillingResult<Option<BillingProfile>> {
        let row = sqlx::query("SELECT data FROM billing_profiles WHERE patient_id = ?")
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(decode(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn get_claim(&self, claim_id: Uuid) -> BillingResult<Option<Claim>> {
        let row = sqlx::query("SELECT data FROM billing_claims WHERE id = ?")
            .bind(claim_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(decode(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn claims_for_patient(&self, patient_id: &str) -> BillingResult<Vec<Claim>> {
        let rows = sqlx::query("SELECT data FROM billing_claims WHERE patient_id = ? ORDER BY rowid")
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await?;
        Self::claims_from_rows(rows)
    }

    async fn snapshot(&self) -> BillingResult<BillingSnapshot> {
        let mut tx = self.pool.begin().await?;

        let profile_rows = sqlx::query("SELECT data FROM billing_profiles ORDER BY patient_id")
            .fetch_all(&mut *tx)
            .await?;
        let claim_rows = sqlx::query("SELECT data FROM billing_claims ORDER BY rowid")
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let profiles = profile_rows
            .iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                decode(&data)
            })
            .collect::<BillingResult<Vec<BillingProfile>>>()?;

        Ok(BillingSnapshot {
            profiles,
            claims: Self::claims_from_rows(claim_rows)?,
        })
    }

    async fn commit(&self, changes: ChangeSet) -> BillingResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let _writer = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        for claim in &changes.claims {
            let stored = sqlx::query("SELECT data FROM billing_claims WHERE id = ?")
                .bind(claim.id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(row) = stored {
                let data: String = row.try_get("data")?;
                let stored: Claim = decode(&data)?;
                // Dropping `tx` rolls back
                ensure_mutable(&stored, claim)?;
            }

            sqlx::query(
                r#"
                INSERT INTO billing_claims (id, patient_id, status, date_of_service, data, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    status = excluded.status,
                    date_of_service = excluded.date_of_service,
                    data = excluded.data,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(claim.id.to_string())
            .bind(&claim.patient_id)
            .bind(claim.status.as_str())
            .bind(claim.date_of_service.to_rfc3339())
            .bind(encode(claim)?)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for profile in &changes.profiles {
            sqlx::query(
                r#"
                INSERT INTO billing_profiles (patient_id, data, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(patient_id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&profile.patient_id)
            .bind(encode(profile)?)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            profiles = changes.profiles.len(),
            claims = changes.claims.len(),
            "Committed billing changes"
        );
        Ok(())
    }
}
