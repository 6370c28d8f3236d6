use crate::{
    eligibility::{days_until_termination, is_coverage_active},
    models::{Authorization, BillingProfile},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Warning thresholds for [`check_authorization_status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationThresholds {
    /// Warn when fewer units than this remain
    pub low_units_threshold: u32,
    /// Warn when the authorization ends in fewer days than this
    pub expiry_warning_days: i64,
}

impl Default for AuthorizationThresholds {
    fn default() -> Self {
        Self {
            low_units_threshold: 10,
            expiry_warning_days: 30,
        }
    }
}

/// Read-only summary of a patient's current authorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationStatusReport {
    pub has_active: bool,
    pub units_remaining: u32,
    pub expiration_date: Option<DateTime<Utc>>,
    pub authorization_number: Option<String>,
    pub warnings: Vec<String>,
}

impl AuthorizationStatusReport {
    fn inactive(warning: &str) -> Self {
        Self {
            has_active: false,
            units_remaining: 0,
            expiration_date: None,
            authorization_number: None,
            warnings: vec![warning.to_string()],
        }
    }
}

/// First authorization, in stored order, that can be billed on `service_date`.
///
/// No fallback: overlapping authorizations resolve to the first match and an
/// exhausted, expired or out-of-range list resolves to `None`.
pub fn find_applicable_authorization(
    profile: &BillingProfile,
    service_date: DateTime<Utc>,
) -> Option<&Authorization> {
    let found = profile
        .authorizations
        .iter()
        .find(|auth| auth.is_applicable_on(service_date));
    debug!(
        authorizations = profile.authorizations.len(),
        resolved = found.is_some(),
        "Resolved applicable authorization"
    );
    found
}

/// Current authorization state for a patient, with near-limit warnings
pub fn check_authorization_status(
    profile: Option<&BillingProfile>,
    now: DateTime<Utc>,
    thresholds: &AuthorizationThresholds,
) -> AuthorizationStatusReport {
    let Some(profile) = profile else {
        return AuthorizationStatusReport::inactive("No billing profile on file");
    };

    let coverage_active = is_coverage_active(&profile.insurance_info, now);
    let Some(authorization) = find_applicable_authorization(profile, now) else {
        let mut report = AuthorizationStatusReport::inactive("No active authorization found");
        if let Some(lapsed) = profile
            .authorizations
            .iter()
            .filter(|auth| auth.is_expired_at(now))
            .max_by_key(|auth| auth.end_date)
        {
            report.warnings.push(format!(
                "Authorization {} expired on {}",
                lapsed.auth_number,
                lapsed.end_date.format("%Y-%m-%d")
            ));
        }
        if !coverage_active {
            report.warnings.push("Insurance coverage is not active".to_string());
        }
        return report;
    };

    let units_remaining = authorization.units_remaining();
    let days_until_expiry = (authorization.end_date - now).num_days();
    let mut warnings = Vec::new();

    if units_remaining < thresholds.low_units_threshold {
        warnings.push(format!("Only {} authorized units remaining", units_remaining));
    }
    if days_until_expiry < thresholds.expiry_warning_days {
        warnings.push(format!(
            "Authorization {} expires in {} days",
            authorization.auth_number, days_until_expiry
        ));
    }
    match days_until_termination(&profile.insurance_info, now) {
        _ if !coverage_active => warnings.push("Insurance coverage is not active".to_string()),
        Some(days) if days < thresholds.expiry_warning_days => {
            warnings.push(format!("Insurance coverage terminates in {} days", days));
        }
        _ => {}
    }

    AuthorizationStatusReport {
        has_active: true,
        units_remaining,
        expiration_date: Some(authorization.end_date),
        authorization_number: Some(authorization.auth_number.clone()),
        warnings,
    }
}
