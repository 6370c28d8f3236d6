use crate::{catalog::CptCatalog, error::BillingResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use logger_redacted::hash_identifier;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Therapy session as recorded by the scheduling side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub patient_id: String,
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub cpt_code: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// Priced line item of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillableSession {
    pub session_id: String,
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub cpt_code: String,
    pub modifiers: Vec<String>,
    pub units: u32,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Where session records come from.
///
/// Unknown ids are left out of the result rather than reported as errors.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Records for `session_ids`, in request order
    async fn sessions(&self, session_ids: &[String]) -> BillingResult<Vec<SessionRecord>>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionSource {
    sessions: DashMap<String, SessionRecord>,
}

impl InMemorySessionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: SessionRecord) {
        self.sessions.insert(record.session_id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionSource for InMemorySessionSource {
    async fn sessions(&self, session_ids: &[String]) -> BillingResult<Vec<SessionRecord>> {
        Ok(session_ids
            .iter()
            .filter_map(|id| self.sessions.get(id).map(|entry| entry.value().clone()))
            .collect())
    }
}

/// Prices session records against the CPT catalog
#[derive(Debug, Clone)]
pub struct BillableSessionGenerator {
    catalog: Arc<CptCatalog>,
}

impl BillableSessionGenerator {
    pub fn new(catalog: Arc<CptCatalog>) -> Self {
        Self { catalog }
    }

    /// Billable line items for `patient_id`, in record order.
    ///
    /// Records for another patient, with an unknown code, or missing a
    /// required modifier are skipped.
    pub fn generate(&self, patient_id: &str, records: &[SessionRecord]) -> Vec<BillableSession> {
        records
            .iter()
            .filter_map(|record| {
                if record.patient_id != patient_id {
                    warn!(
                        session_id = %record.session_id,
                        patient = %hash_identifier(patient_id),
                        "Session belongs to another patient, skipping"
                    );
                    return None;
                }
                self.price(record)
            })
            .collect()
    }

    pub fn price(&self, record: &SessionRecord) -> Option<BillableSession> {
        let Some(code) = self.catalog.lookup(&record.cpt_code) else {
            warn!(session_id = %record.session_id, cpt_code = %record.cpt_code, "Unknown CPT code, skipping session");
            return None;
        };

        let modifiers: Vec<String> = record
            .modifiers
            .iter()
            .filter(|modifier| {
                let allowed = code.allows_modifier(modifier);
                if !allowed {
                    warn!(session_id = %record.session_id, modifier = %modifier, cpt_code = %code.code, "Dropping modifier not valid for code");
                }
                allowed
            })
            .cloned()
            .collect();
        if code.requires_modifier && modifiers.is_empty() {
            warn!(session_id = %record.session_id, cpt_code = %code.code, "Code requires a modifier, skipping session");
            return None;
        }

        let units = code.units_for(record.duration_minutes);
        Some(BillableSession {
            session_id: record.session_id.clone(),
            date: record.date,
            duration_minutes: record.duration_minutes,
            cpt_code: code.code.clone(),
            modifiers,
            units,
            rate: code.default_rate,
            amount: code.default_rate * Decimal::from(units),
        })
    }
}
