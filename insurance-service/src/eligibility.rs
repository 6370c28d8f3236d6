use crate::models::InsuranceInfo;
use chrono::{DateTime, Utc};

/// Coverage is active from the effective date through the termination date, inclusive
pub fn is_coverage_active(insurance: &InsuranceInfo, date: DateTime<Utc>) -> bool {
    insurance.effective_date <= date
        && insurance
            .termination_date
            .map_or(true, |terminated| date <= terminated)
}

/// Whole days from `now` until coverage terminates; `None` for open-ended coverage
pub fn days_until_termination(insurance: &InsuranceInfo, now: DateTime<Utc>) -> Option<i64> {
    insurance
        .termination_date
        .map(|terminated| (terminated - now).num_days())
}
