use crate::error::{InsuranceError, InsuranceResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing profile, one per patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingProfile {
    pub patient_id: String,
    pub insurance_info: InsuranceInfo,
    pub billing_address: BillingAddress,
    pub payment_method: Option<PaymentMethod>,
    /// Stored order is resolution order
    pub authorizations: Vec<Authorization>,
    pub balance: Decimal,
    pub credit_limit: Decimal,
}

impl BillingProfile {
    pub fn new(patient_id: impl Into<String>, insurance_info: InsuranceInfo) -> Self {
        Self {
            patient_id: patient_id.into(),
            insurance_info,
            billing_address: BillingAddress::default(),
            payment_method: None,
            authorizations: Vec::new(),
            balance: Decimal::ZERO,
            credit_limit: Decimal::ZERO,
        }
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorizations.push(authorization);
        self
    }

    pub fn authorization(&self, id: Uuid) -> Option<&Authorization> {
        self.authorizations.iter().find(|auth| auth.id == id)
    }

    pub fn authorization_mut(&mut self, id: Uuid) -> Option<&mut Authorization> {
        self.authorizations.iter_mut().find(|auth| auth.id == id)
    }

    /// Structural checks applied before a profile is stored
    pub fn validate(&self) -> InsuranceResult<()> {
        if self.patient_id.trim().is_empty() {
            return Err(InsuranceError::InvalidProfile("patient id is empty".to_string()));
        }
        if self.insurance_info.provider.trim().is_empty() {
            return Err(InsuranceError::InvalidProfile("insurance provider is empty".to_string()));
        }
        if self.credit_limit.is_sign_negative() {
            return Err(InsuranceError::InvalidProfile("credit limit is negative".to_string()));
        }
        for authorization in &self.authorizations {
            authorization.validate()?;
        }
        Ok(())
    }
}

/// Insurance coverage details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceInfo {
    pub provider: String,
    pub payer_id: Option<String>,
    pub policy_number: String,
    pub group_number: Option<String>,
    pub subscriber_id: String,
    pub subscriber_name: String,
    pub relationship: Relationship,
    pub coverage_type: CoverageType,
    pub copay: Decimal,
    pub deductible: Decimal,
    pub deductible_met: Decimal,
    pub out_of_pocket_max: Decimal,
    pub out_of_pocket_met: Decimal,
    pub effective_date: DateTime<Utc>,
    pub termination_date: Option<DateTime<Utc>>,
}

impl InsuranceInfo {
    pub fn new(provider: impl Into<String>, policy_number: impl Into<String>, effective_date: DateTime<Utc>) -> Self {
        Self {
            provider: provider.into(),
            payer_id: None,
            policy_number: policy_number.into(),
            group_number: None,
            subscriber_id: String::new(),
            subscriber_name: String::new(),
            relationship: Relationship::SelfInsured,
            coverage_type: CoverageType::Commercial,
            copay: Decimal::ZERO,
            deductible: Decimal::ZERO,
            deductible_met: Decimal::ZERO,
            out_of_pocket_max: Decimal::ZERO,
            out_of_pocket_met: Decimal::ZERO,
            effective_date,
            termination_date: None,
        }
    }
}

/// Patient's relationship to the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    #[serde(rename = "self")]
    SelfInsured,
    Spouse,
    Child,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    Commercial,
    Medicaid,
    Medicare,
    Tricare,
    SelfPay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Payment method on file; only a display label is kept, never card data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub method_type: PaymentMethodType,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodType {
    Card,
    Ach,
    Check,
    Hsa,
}

/// Insurer-granted permission to bill up to `total_units` within a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub id: Uuid,
    pub auth_number: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_units: u32,
    /// Never decreases
    pub used_units: u32,
    pub unit_type: UnitType,
    /// Empty means any code may be billed
    pub cpt_codes: Vec<String>,
    pub diagnosis_codes: Vec<String>,
    pub status: AuthorizationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Sessions,
    Minutes,
    Hours,
}

/// Stored status. `Expired` is only ever set by data entry; date expiry is
/// evaluated with [`Authorization::is_expired_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Active,
    Expired,
    Exhausted,
}

/// Outcome of consuming units from an authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationUsage {
    pub authorization_id: Uuid,
    pub units_consumed: u32,
    pub units_remaining: u32,
    /// True when this consumption flipped the authorization to exhausted
    pub exhausted: bool,
}

impl Authorization {
    pub fn new(
        auth_number: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        total_units: u32,
        unit_type: UnitType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            auth_number: auth_number.into(),
            start_date,
            end_date,
            total_units,
            used_units: 0,
            unit_type,
            cpt_codes: Vec::new(),
            diagnosis_codes: Vec::new(),
            status: AuthorizationStatus::Active,
        }
    }

    pub fn units_remaining(&self) -> u32 {
        self.total_units.saturating_sub(self.used_units)
    }

    pub fn covers_date(&self, date: DateTime<Utc>) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.end_date < now
    }

    pub fn allows_code(&self, code: &str) -> bool {
        self.cpt_codes.is_empty() || self.cpt_codes.iter().any(|allowed| allowed == code)
    }

    /// Active, in range and not yet used up
    pub fn is_applicable_on(&self, date: DateTime<Utc>) -> bool {
        self.status == AuthorizationStatus::Active
            && self.covers_date(date)
            && self.used_units < self.total_units
    }

    /// Consume `units`, flipping to exhausted once the total is reached.
    ///
    /// Consumption never exceeds the total and never partially applies.
    pub fn consume(&mut self, units: u32) -> InsuranceResult<AuthorizationUsage> {
        if self.status != AuthorizationStatus::Active {
            return Err(InsuranceError::AuthorizationNotActive(self.id));
        }
        let remaining = self.units_remaining();
        if units > remaining {
            return Err(InsuranceError::UnitsExceeded {
                id: self.id,
                requested: units,
                remaining,
            });
        }

        self.used_units += units;
        let exhausted = self.used_units >= self.total_units;
        if exhausted {
            self.status = AuthorizationStatus::Exhausted;
        }

        Ok(AuthorizationUsage {
            authorization_id: self.id,
            units_consumed: units,
            units_remaining: self.units_remaining(),
            exhausted,
        })
    }

    pub fn validate(&self) -> InsuranceResult<()> {
        let invalid = |reason: &str| InsuranceError::InvalidAuthorization {
            id: self.id,
            reason: reason.to_string(),
        };
        if self.start_date > self.end_date {
            return Err(invalid("start date is after end date"));
        }
        if self.total_units == 0 {
            return Err(invalid("total units must be positive"));
        }
        if self.status == AuthorizationStatus::Active && self.used_units >= self.total_units {
            return Err(invalid("active authorization has no units remaining"));
        }
        if self.used_units > self.total_units {
            return Err(invalid("used units exceed total units"));
        }
        Ok(())
    }
}
