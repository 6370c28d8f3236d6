//! Read-only aggregation of claims into financial reports
//!
//! Reports are derived fresh from one snapshot of claims and profiles and are
//! never stored. Only claims whose date of service falls inside the requested
//! window (inclusive) are counted; every section below works on that subset.

use crate::{
    config::ProjectionConfig,
    models::{Claim, ClaimStatus},
};
use chrono::{DateTime, Duration, Utc};
use insurance_service::BillingProfile;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const UNKNOWN_INSURER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingReport {
    pub period: ReportPeriod,
    pub generated_at: DateTime<Utc>,
    pub summary: BillingSummary,
    pub insurer_stats: Vec<InsurerStats>,
    pub patient_stats: Vec<PatientStats>,
    pub aging: AgingBuckets,
    pub projections: RevenueProjection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportPeriod {
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummary {
    pub total_claims: usize,
    pub total_billed: Decimal,
    pub total_collected: Decimal,
    pub total_pending: Decimal,
    pub total_denied: Decimal,
    pub total_write_off: Decimal,
    /// Percent of billed amount paid, averaged over paid claims
    pub average_reimbursement_rate: Decimal,
    pub average_days_to_payment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurerStats {
    pub insurer: String,
    pub claim_count: usize,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    /// Percent of claims currently denied
    pub denial_rate: Decimal,
    pub average_days_to_payment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStats {
    pub patient_id: String,
    pub sessions_billed: usize,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    /// Patient responsibility of paid claims
    pub balance: Decimal,
    pub last_payment_date: Option<DateTime<Utc>>,
}

/// Unpaid submitted claims by days since submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingBuckets {
    /// 0-30 days
    pub current: Decimal,
    /// 31-60 days
    pub days30: Decimal,
    /// 61-90 days
    pub days60: Decimal,
    /// 91-120 days
    pub days90: Decimal,
    /// More than 120 days
    pub over90: Decimal,
}

impl AgingBuckets {
    fn add(&mut self, days_pending: i64, amount: Decimal) {
        let bucket = match days_pending {
            ..=30 => &mut self.current,
            31..=60 => &mut self.days30,
            61..=90 => &mut self.days60,
            91..=120 => &mut self.days90,
            _ => &mut self.over90,
        };
        *bucket += amount;
    }

    pub fn total(&self) -> Decimal {
        self.current + self.days30 + self.days60 + self.days90 + self.over90
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueProjection {
    pub next_month: Decimal,
    pub next_quarter: Decimal,
    /// Claims the projection was computed from
    pub basis_claims: usize,
    pub assumptions: Vec<String>,
}

/// Aggregate `claims` with a date of service in `period`, as seen at `now`
pub fn generate_billing_report(
    claims: &[Claim],
    profiles: &[BillingProfile],
    period: ReportPeriod,
    now: DateTime<Utc>,
    projection: &ProjectionConfig,
) -> BillingReport {
    let in_window: Vec<&Claim> = claims
        .iter()
        .filter(|claim| period.contains(claim.date_of_service))
        .collect();

    BillingReport {
        period,
        generated_at: now,
        summary: summarize(&in_window),
        insurer_stats: insurer_stats(&in_window, profiles),
        patient_stats: patient_stats(&in_window),
        aging: aging(&in_window, now),
        projections: project(&in_window, now, projection),
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
}

fn percent(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(2)
}

/// Paid claims that carry a payment date
fn settled<'a>(claims: &'a [&'a Claim]) -> impl Iterator<Item = &'a Claim> + 'a {
    claims
        .iter()
        .copied()
        .filter(|claim| claim.is_paid() && claim.payment_date.is_some())
}

fn average_days_to_payment(claims: &[&Claim]) -> Decimal {
    let days: Vec<Decimal> = settled(claims).filter_map(Claim::days_to_payment).collect();
    mean(&days).round_dp(1)
}

fn billed_where(claims: &[&Claim], predicate: impl Fn(&Claim) -> bool) -> Decimal {
    claims
        .iter()
        .filter(|claim| predicate(claim))
        .map(|claim| claim.total_amount)
        .sum()
}

fn summarize(claims: &[&Claim]) -> BillingSummary {
    let reimbursement_rates: Vec<Decimal> = settled(claims)
        .filter(|claim| !claim.total_amount.is_zero())
        .map(|claim| claim.paid_amount.unwrap_or(Decimal::ZERO) / claim.total_amount * Decimal::ONE_HUNDRED)
        .collect();

    BillingSummary {
        total_claims: claims.len(),
        total_billed: claims.iter().map(|claim| claim.total_amount).sum(),
        total_collected: claims
            .iter()
            .filter(|claim| claim.is_paid())
            .filter_map(|claim| claim.paid_amount)
            .sum(),
        total_pending: billed_where(claims, |claim| claim.status.is_pending()),
        total_denied: billed_where(claims, |claim| claim.status == ClaimStatus::Denied),
        total_write_off: claims.iter().filter_map(|claim| claim.write_off()).sum(),
        average_reimbursement_rate: mean(&reimbursement_rates).round_dp(2),
        average_days_to_payment: average_days_to_payment(claims),
    }
}

fn insurer_stats(claims: &[&Claim], profiles: &[BillingProfile]) -> Vec<InsurerStats> {
    // Attributed to the insurer on file now, not the one at claim time
    let insurer_of: HashMap<&str, &str> = profiles
        .iter()
        .map(|profile| (profile.patient_id.as_str(), profile.insurance_info.provider.as_str()))
        .collect();

    let mut grouped: BTreeMap<&str, Vec<&Claim>> = BTreeMap::new();
    for claim in claims {
        let insurer = insurer_of
            .get(claim.patient_id.as_str())
            .copied()
            .unwrap_or(UNKNOWN_INSURER);
        grouped.entry(insurer).or_default().push(*claim);
    }

    grouped
        .into_iter()
        .map(|(insurer, claims)| {
            let denied = claims.iter().filter(|claim| claim.status == ClaimStatus::Denied).count();
            InsurerStats {
                insurer: insurer.to_string(),
                claim_count: claims.len(),
                total_billed: claims.iter().map(|claim| claim.total_amount).sum(),
                total_paid: claims.iter().filter_map(|claim| claim.paid_amount).sum(),
                denial_rate: percent(denied, claims.len()),
                average_days_to_payment: average_days_to_payment(&claims),
            }
        })
        .collect()
}

fn patient_stats(claims: &[&Claim]) -> Vec<PatientStats> {
    let mut stats: BTreeMap<&str, PatientStats> = BTreeMap::new();
    for claim in claims {
        let entry = stats.entry(claim.patient_id.as_str()).or_insert_with(|| PatientStats {
            patient_id: claim.patient_id.clone(),
            sessions_billed: 0,
            total_billed: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            balance: Decimal::ZERO,
            last_payment_date: None,
        });

        entry.sessions_billed += claim.sessions.len();
        entry.total_billed += claim.total_amount;
        if claim.is_paid() {
            entry.total_paid += claim.paid_amount.unwrap_or(Decimal::ZERO);
            entry.balance += claim.patient_responsibility.unwrap_or(Decimal::ZERO);
            entry.last_payment_date = entry.last_payment_date.max(claim.payment_date);
        }
    }
    stats.into_values().collect()
}

fn aging(claims: &[&Claim], now: DateTime<Utc>) -> AgingBuckets {
    let mut buckets = AgingBuckets::default();
    for claim in claims.iter().filter(|claim| !claim.is_paid()) {
        // Never submitted means never aging
        if let Some(submitted) = claim.date_submitted {
            buckets.add((now - submitted).num_days(), claim.total_amount);
        }
    }
    buckets
}

fn project(claims: &[&Claim], now: DateTime<Utc>, config: &ProjectionConfig) -> RevenueProjection {
    let window_start = now - Duration::days(config.window_days);
    let collection_rate = Decimal::from(config.expected_collection_percent) / Decimal::ONE_HUNDRED;

    let recent: Vec<&Claim> = claims
        .iter()
        .copied()
        .filter(|claim| window_start <= claim.date_of_service && claim.date_of_service <= now)
        .collect();
    let expected: Decimal = recent
        .iter()
        .map(|claim| match (claim.status, claim.paid_amount) {
            (ClaimStatus::Paid, Some(paid)) => paid,
            _ => claim.total_amount * collection_rate,
        })
        .sum();
    let next_month = expected.round_dp(2);

    RevenueProjection {
        next_month,
        next_quarter: next_month * Decimal::from(3),
        basis_claims: recent.len(),
        assumptions: vec![
            format!(
                "Based on {} claims with a date of service in the last {} days",
                recent.len(),
                config.window_days
            ),
            format!(
                "Unpaid claims are expected to collect {}% of the billed amount",
                config.expected_collection_percent
            ),
            "Next month repeats the trailing volume and next quarter is three times next month".to_string(),
            "Linear extrapolation only; seasonality and payer mix changes are not modeled".to_string(),
        ],
    }
}
