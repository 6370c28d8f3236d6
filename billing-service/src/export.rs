use crate::{
    error::{BillingError, BillingResult},
    models::Claim,
    repository::BillingSnapshot,
};
use chrono::Datelike;
use insurance_service::BillingProfile;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

const CSV_HEADER: [&str; 6] = ["Claim ID", "Patient ID", "Date", "Amount", "Status", "Paid Amount"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = BillingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(BillingError::Validation(format!("unsupported export format '{}'", other))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Full JSON dump, stored as `[key, record]` pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingExport {
    pub billing_profiles: Vec<(String, BillingProfile)>,
    pub billing_claims: Vec<(Uuid, Claim)>,
}

impl From<BillingSnapshot> for BillingExport {
    fn from(snapshot: BillingSnapshot) -> Self {
        Self {
            billing_profiles: snapshot
                .profiles
                .into_iter()
                .map(|profile| (profile.patient_id.clone(), profile))
                .collect(),
            billing_claims: snapshot.claims.into_iter().map(|claim| (claim.id, claim)).collect(),
        }
    }
}

impl TryFrom<BillingExport> for BillingSnapshot {
    type Error = BillingError;

    fn try_from(export: BillingExport) -> BillingResult<Self> {
        let profiles = export
            .billing_profiles
            .into_iter()
            .map(|(patient_id, profile)| {
                if patient_id != profile.patient_id {
                    return Err(BillingError::Validation(format!(
                        "profile key does not match its patient id ({})",
                        logger_redacted::hash_identifier(&patient_id)
                    )));
                }
                Ok(profile)
            })
            .collect::<BillingResult<Vec<_>>>()?;
        let claims = export
            .billing_claims
            .into_iter()
            .map(|(id, claim)| {
                if id != claim.id {
                    return Err(BillingError::Validation(format!("claim key {} does not match claim id", id)));
                }
                Ok(claim)
            })
            .collect::<BillingResult<Vec<_>>>()?;
        Ok(BillingSnapshot { profiles, claims })
    }
}

pub fn export_json(snapshot: BillingSnapshot) -> BillingResult<String> {
    serde_json::to_string_pretty(&BillingExport::from(snapshot))
        .map_err(|e| BillingError::Export(format!("Failed to serialize billing data: {}", e)))
}

pub fn parse_json(data: &str) -> BillingResult<BillingSnapshot> {
    let export: BillingExport =
        serde_json::from_str(data).map_err(|e| BillingError::Validation(format!("Malformed billing export: {}", e)))?;
    export.try_into()
}

/// One summary row per claim; authorizations and session detail are left out
pub fn export_csv(claims: &[Claim]) -> BillingResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |e: csv::Error| BillingError::Export(format!("Failed to write CSV: {}", e));

    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for claim in claims {
        let date = claim.date_of_service;
        writer
            .write_record([
                claim.id.to_string(),
                claim.patient_id.clone(),
                format!("{}/{}/{}", date.month(), date.day(), date.year()),
                format!("{:.2}", claim.total_amount),
                claim.status.to_string(),
                format!("{:.2}", claim.paid_amount.unwrap_or(Decimal::ZERO)),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| BillingError::Export(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| BillingError::Export(format!("CSV is not UTF-8: {}", e)))
}
