use crate::{
    error::{BillingError, BillingResult},
    sessions::BillableSession,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Insurance claim for one or more billable therapy sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: Uuid,
    pub patient_id: String,
    /// Assigned by the clearinghouse on submission
    pub claim_number: Option<String>,
    pub date_of_service: DateTime<Utc>,
    pub date_submitted: Option<DateTime<Utc>>,
    pub sessions: Vec<BillableSession>,
    pub total_amount: Decimal,
    pub allowed_amount: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub patient_responsibility: Option<Decimal>,
    pub status: ClaimStatus,
    pub denial_reason: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub check_number: Option<String>,
    /// Authorization the claim's units were drawn from
    pub authorization_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    /// New draft claim. Date of service is the first session's date.
    pub fn draft(
        patient_id: impl Into<String>,
        sessions: Vec<BillableSession>,
        authorization_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> BillingResult<Self> {
        let date_of_service = sessions
            .first()
            .map(|session| session.date)
            .ok_or(BillingError::NoBillableSessions { requested: 0 })?;
        let total_amount = sessions.iter().map(|session| session.amount).sum();

        Ok(Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.into(),
            claim_number: None,
            date_of_service,
            date_submitted: None,
            sessions,
            total_amount,
            allowed_amount: None,
            paid_amount: None,
            patient_responsibility: None,
            status: ClaimStatus::Draft,
            denial_reason: None,
            payment_date: None,
            check_number: None,
            authorization_id,
            created_at,
        })
    }

    /// Authorization units this claim consumed
    pub fn units(&self) -> u32 {
        self.sessions
            .iter()
            .fold(0u32, |total, session| total.saturating_add(session.units))
    }

    pub fn is_paid(&self) -> bool {
        self.status == ClaimStatus::Paid
    }

    /// Billed amount above what the payer allows, for paid claims
    pub fn write_off(&self) -> Option<Decimal> {
        if !self.is_paid() {
            return None;
        }
        self.allowed_amount.map(|allowed| self.total_amount - allowed)
    }

    /// Fractional days between submission and payment
    pub fn days_to_payment(&self) -> Option<Decimal> {
        let submitted = self.date_submitted?;
        let paid = self.payment_date?;
        Some(Decimal::from((paid - submitted).num_seconds()) / Decimal::from(86_400))
    }

    pub fn contains_session(&self, session_id: &str) -> bool {
        self.sessions.iter().any(|session| session.session_id == session_id)
    }
}

/// Claim lifecycle state
///
/// ```text
/// draft -> submitted -> processing -> paid
///              |             |
///              +--> denied <-+
///                     |
///                  appealed -> processing
/// ```
///
/// Payment may be recorded from any state except `paid`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Draft,
    Submitted,
    Processing,
    Paid,
    Denied,
    Appealed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "draft",
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::Processing => "processing",
            ClaimStatus::Paid => "paid",
            ClaimStatus::Denied => "denied",
            ClaimStatus::Appealed => "appealed",
        }
    }

    pub fn can_transition_to(self, next: ClaimStatus) -> bool {
        use ClaimStatus::*;
        match (self, next) {
            (Paid, _) => false,
            (_, Paid) => true,
            (Draft, Submitted)
            | (Submitted, Processing)
            | (Appealed, Processing)
            | (Submitted, Denied)
            | (Processing, Denied)
            | (Denied, Appealed) => true,
            _ => false,
        }
    }

    /// With the payer and not yet decided; appeals are not counted
    pub fn is_pending(&self) -> bool {
        matches!(self, ClaimStatus::Submitted | ClaimStatus::Processing)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = BillingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(ClaimStatus::Draft),
            "submitted" => Ok(ClaimStatus::Submitted),
            "processing" => Ok(ClaimStatus::Processing),
            "paid" => Ok(ClaimStatus::Paid),
            "denied" => Ok(ClaimStatus::Denied),
            "appealed" => Ok(ClaimStatus::Appealed),
            other => Err(BillingError::Validation(format!("unknown claim status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClaimOptions {
    /// Submit to the clearinghouse right after the draft is stored
    pub submit_immediately: bool,
}

/// Payer remittance for a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub amount: Decimal,
    pub allowed_amount: Decimal,
    pub patient_responsibility: Decimal,
    pub check_number: Option<String>,
    pub payment_date: DateTime<Utc>,
}

impl PaymentDetails {
    pub fn validate(&self, claim_total: Decimal) -> BillingResult<()> {
        if self.amount < Decimal::ZERO
            || self.allowed_amount < Decimal::ZERO
            || self.patient_responsibility < Decimal::ZERO
        {
            return Err(BillingError::Validation("payment amounts must not be negative".to_string()));
        }
        if self.amount > claim_total {
            return Err(BillingError::Validation(format!(
                "payment {} exceeds claim total {}",
                self.amount, claim_total
            )));
        }
        Ok(())
    }
}

/// Payer-side status reported by a clearinghouse poll or webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ClaimStatusUpdate {
    Pending,
    Processing,
    Denied { reason: String },
}
