use crate::models::{Claim, ClaimStatus};
use events_bus::{DomainEvent, EventBus};
use insurance_service::{Authorization, BillingProfile};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

pub mod topics {
    pub const PROFILE_UPSERTED: &str = "billing.profile.upserted";
    pub const CLAIM_CREATED: &str = "billing.claim.created";
    pub const CLAIM_SUBMITTED: &str = "billing.claim.submitted";
    pub const CLAIM_STATUS_CHANGED: &str = "billing.claim.status_changed";
    pub const CLAIM_DENIED: &str = "billing.claim.denied";
    pub const CLAIM_APPEALED: &str = "billing.claim.appealed";
    pub const PAYMENT_PROCESSED: &str = "billing.payment.processed";
    pub const AUTHORIZATION_EXHAUSTED: &str = "billing.authorization.exhausted";
    pub const AUTHORIZATION_NEAR_LIMIT: &str = "billing.authorization.near_limit";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEventPayload {
    pub claim_id: Uuid,
    pub patient_id: String,
    pub amount: Decimal,
    pub status: ClaimStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<ClaimStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ClaimEventPayload {
    fn of(claim: &Claim) -> Self {
        Self {
            claim_id: claim.id,
            patient_id: claim.patient_id.clone(),
            amount: claim.total_amount,
            status: claim.status,
            previous_status: None,
            claim_number: claim.claim_number.clone(),
            reason: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventPayload {
    pub claim_id: Uuid,
    pub patient_id: String,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub patient_responsibility: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationEventPayload {
    pub patient_id: String,
    pub authorization_id: Uuid,
    pub authorization_number: String,
    pub units_remaining: u32,
    pub total_units: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileEventPayload<'a> {
    patient_id: &'a str,
    provider: &'a str,
    authorizations: usize,
}

/// Publishes billing domain events.
///
/// Event delivery is best effort: a publish failure is logged and never fails
/// the billing operation that produced it.
#[derive(Debug, Clone, Default)]
pub struct BillingEvents {
    bus: EventBus,
}

impl BillingEvents {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn publish<T: Serialize>(&self, topic: &str, payload: &T) {
        let result = DomainEvent::from_payload(topic, payload).and_then(|event| self.bus.publish(event));
        if let Err(e) = result {
            warn!(topic = %topic, error = %e, "Failed to publish billing event");
        }
    }

    pub fn profile_upserted(&self, profile: &BillingProfile) {
        self.publish(
            topics::PROFILE_UPSERTED,
            &ProfileEventPayload {
                patient_id: &profile.patient_id,
                provider: &profile.insurance_info.provider,
                authorizations: profile.authorizations.len(),
            },
        );
    }

    pub fn claim_created(&self, claim: &Claim) {
        self.publish(topics::CLAIM_CREATED, &ClaimEventPayload::of(claim));
    }

    pub fn claim_submitted(&self, claim: &Claim) {
        self.publish(topics::CLAIM_SUBMITTED, &ClaimEventPayload::of(claim));
    }

    pub fn claim_status_changed(&self, claim: &Claim, previous: ClaimStatus) {
        let payload = ClaimEventPayload {
            previous_status: Some(previous),
            ..ClaimEventPayload::of(claim)
        };
        self.publish(topics::CLAIM_STATUS_CHANGED, &payload);
    }

    pub fn claim_denied(&self, claim: &Claim) {
        let payload = ClaimEventPayload {
            reason: claim.denial_reason.clone(),
            ..ClaimEventPayload::of(claim)
        };
        self.publish(topics::CLAIM_DENIED, &payload);
    }

    pub fn claim_appealed(&self, claim: &Claim) {
        self.publish(topics::CLAIM_APPEALED, &ClaimEventPayload::of(claim));
    }

    pub fn payment_processed(&self, claim: &Claim) {
        self.publish(
            topics::PAYMENT_PROCESSED,
            &PaymentEventPayload {
                claim_id: claim.id,
                patient_id: claim.patient_id.clone(),
                amount: claim.total_amount,
                paid_amount: claim.paid_amount.unwrap_or(Decimal::ZERO),
                patient_responsibility: claim.patient_responsibility.unwrap_or(Decimal::ZERO),
            },
        );
    }

    pub fn authorization_exhausted(&self, patient_id: &str, authorization: &Authorization) {
        self.publish(topics::AUTHORIZATION_EXHAUSTED, &Self::authorization_payload(patient_id, authorization));
    }

    pub fn authorization_near_limit(&self, patient_id: &str, authorization: &Authorization) {
        self.publish(topics::AUTHORIZATION_NEAR_LIMIT, &Self::authorization_payload(patient_id, authorization));
    }

    fn authorization_payload(patient_id: &str, authorization: &Authorization) -> AuthorizationEventPayload {
        AuthorizationEventPayload {
            patient_id: patient_id.to_string(),
            authorization_id: authorization.id,
            authorization_number: authorization.auth_number.clone(),
            units_remaining: authorization.units_remaining(),
            total_units: authorization.total_units,
        }
    }
}
