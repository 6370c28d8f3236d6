use crate::{
    catalog::CptCatalog,
    clearinghouse::Clearinghouse,
    error::{BillingError, BillingResult},
    events::BillingEvents,
    locks::PatientLocks,
    models::{Claim, ClaimStatus, ClaimStatusUpdate, CreateClaimOptions, PaymentDetails},
    repository::{BillingRepository, ChangeSet},
    sessions::{BillableSession, BillableSessionGenerator, SessionSource},
};
use chrono::Utc;
use error_common::log_failure;
use insurance_service::{find_applicable_authorization, AuthorizationThresholds, InsuranceError};
use logger_redacted::{hash_identifier, PiiRedactor};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Drives claims from draft to paid and keeps authorization usage in step.
///
/// Every mutation of a patient's claims or profile happens under that
/// patient's lock and is written as one [`ChangeSet`].
pub struct ClaimLifecycleEngine {
    repository: Arc<dyn BillingRepository>,
    sessions: Arc<dyn SessionSource>,
    clearinghouse: Arc<dyn Clearinghouse>,
    generator: BillableSessionGenerator,
    locks: Arc<PatientLocks>,
    events: BillingEvents,
    thresholds: AuthorizationThresholds,
    redactor: PiiRedactor,
}

impl ClaimLifecycleEngine {
    pub fn new(
        repository: Arc<dyn BillingRepository>,
        sessions: Arc<dyn SessionSource>,
        clearinghouse: Arc<dyn Clearinghouse>,
        catalog: Arc<CptCatalog>,
        locks: Arc<PatientLocks>,
        events: BillingEvents,
        thresholds: AuthorizationThresholds,
    ) -> Self {
        Self {
            repository,
            sessions,
            clearinghouse,
            generator: BillableSessionGenerator::new(catalog),
            locks,
            events,
            thresholds,
            redactor: PiiRedactor::default(),
        }
    }

    /// Build a draft claim from completed sessions and draw its units from
    /// the authorization applicable on the date of service.
    ///
    /// Preconditions are checked in order: profile on file, at least one
    /// billable session, an applicable authorization, enough units. On any
    /// failure nothing is stored.
    #[instrument(skip(self, session_ids), fields(patient = %hash_identifier(patient_id), sessions = session_ids.len()))]
    pub async fn create_claim(
        &self,
        patient_id: &str,
        session_ids: &[String],
        options: CreateClaimOptions,
    ) -> BillingResult<Claim> {
        let claim = match self.create_draft(patient_id, session_ids).await {
            Ok(claim) => claim,
            Err(e) => {
                log_failure("create_claim", &e);
                return Err(e);
            }
        };

        if !options.submit_immediately {
            return Ok(claim);
        }
        // The draft and its units are already committed; a failed submit leaves it for retry
        match self.submit_claim(claim.id).await {
            Ok(true) => match self.repository.get_claim(claim.id).await {
                Ok(Some(submitted)) => return Ok(submitted),
                Ok(None) => {}
                Err(e) => log_failure("create_claim", &e),
            },
            Ok(false) => {}
            Err(e) => log_failure("submit_claim", &e),
        }
        Ok(claim)
    }

    async fn create_draft(&self, patient_id: &str, session_ids: &[String]) -> BillingResult<Claim> {
        let _guard = self.locks.lock(patient_id).await;

        let mut profile = self
            .repository
            .get_profile(patient_id)
            .await?
            .ok_or_else(|| BillingError::NoProfile {
                patient_id: patient_id.to_string(),
            })?;

        let existing_claims = self.repository.claims_for_patient(patient_id).await?;

        let mut seen = HashSet::new();
        let records: Vec<_> = self
            .sessions
            .sessions(session_ids)
            .await?
            .into_iter()
            .filter(|record| {
                if existing_claims.iter().any(|claim| claim.contains_session(&record.session_id)) {
                    warn!(session_id = %record.session_id, "Session already billed on another claim, skipping");
                    return false;
                }
                seen.insert(record.session_id.clone())
            })
            .collect();

        let mut billable = self.generator.generate(patient_id, &records);
        let service_date = billable
            .first()
            .map(|session| session.date)
            .ok_or(BillingError::NoBillableSessions {
                requested: session_ids.len(),
            })?;

        let authorization_id = find_applicable_authorization(&profile, service_date)
            .map(|auth| auth.id)
            .ok_or(BillingError::NoAuthorization { service_date })?;
        let authorization = profile
            .authorization_mut(authorization_id)
            .ok_or(BillingError::NoAuthorization { service_date })?;

        // Every billed session, and so the claim's date of service, must fall under the authorization
        billable.retain(|session| {
            if !authorization.allows_code(&session.cpt_code) {
                warn!(
                    session_id = %session.session_id,
                    cpt_code = %session.cpt_code,
                    "Code not covered by authorization, skipping session"
                );
                return false;
            }
            if !authorization.covers_date(session.date) {
                warn!(
                    session_id = %session.session_id,
                    authorization = %authorization.auth_number,
                    "Session outside authorization window, skipping"
                );
                return false;
            }
            true
        });
        if billable.is_empty() {
            return Err(BillingError::NoAuthorization { service_date });
        }

        let needed = total_units(&billable)?;
        let usage = authorization.consume(needed).map_err(|e| match e {
            InsuranceError::UnitsExceeded { remaining, .. } => BillingError::InsufficientUnits {
                authorization_number: authorization.auth_number.clone(),
                remaining,
                needed,
            },
            other => BillingError::Insurance(other),
        })?;
        let authorization = authorization.clone();

        let claim = Claim::draft(patient_id, billable, Some(authorization_id), Utc::now())?;
        self.repository
            .commit(ChangeSet::new().with_profile(profile).with_claim(claim.clone()))
            .await?;

        info!(
            claim_id = %claim.id,
            amount = %claim.total_amount,
            units = usage.units_consumed,
            units_remaining = usage.units_remaining,
            "Claim created"
        );
        self.events.claim_created(&claim);
        if usage.exhausted {
            info!(authorization = %authorization.auth_number, "Authorization exhausted");
            self.events.authorization_exhausted(patient_id, &authorization);
        } else if usage.units_remaining < self.thresholds.low_units_threshold {
            self.events.authorization_near_limit(patient_id, &authorization);
        }

        Ok(claim)
    }

    /// Read a claim, take its patient's lock and read it again under the lock
    async fn lock_claim(&self, claim_id: Uuid) -> BillingResult<Option<(OwnedMutexGuard<()>, Claim)>> {
        let Some(claim) = self.repository.get_claim(claim_id).await? else {
            return Ok(None);
        };
        let guard = self.locks.lock(&claim.patient_id).await;
        Ok(self.repository.get_claim(claim_id).await?.map(|claim| (guard, claim)))
    }

    /// Send a draft claim to the clearinghouse.
    ///
    /// Returns `false` without changing anything when the claim is missing,
    /// not a draft, or the clearinghouse refuses it; the draft can be retried.
    #[instrument(skip(self))]
    pub async fn submit_claim(&self, claim_id: Uuid) -> BillingResult<bool> {
        let Some((_guard, mut claim)) = self.lock_claim(claim_id).await? else {
            warn!("Submit requested for unknown claim");
            return Ok(false);
        };
        if claim.status != ClaimStatus::Draft {
            debug!(status = %claim.status, "Claim is not a draft, nothing to submit");
            return Ok(false);
        }

        let receipt = match self.clearinghouse.submit(&claim).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %self.redactor.redact(&e.to_string()), "Clearinghouse submission failed, claim left in draft");
                return Ok(false);
            }
        };

        claim.claim_number = Some(receipt.claim_number);
        claim.date_submitted = Some(receipt.accepted_at);
        claim.status = ClaimStatus::Submitted;
        self.repository.commit(ChangeSet::new().with_claim(claim.clone())).await?;

        info!(claim_number = ?claim.claim_number, "Claim submitted");
        self.events.claim_submitted(&claim);
        Ok(true)
    }

    /// Record payer remittance. Allowed from any state except paid.
    #[instrument(skip(self, payment))]
    pub async fn process_payment(&self, claim_id: Uuid, payment: PaymentDetails) -> BillingResult<Claim> {
        let result = self.apply_payment(claim_id, payment).await;
        if let Err(e) = &result {
            log_failure("process_payment", e);
        }
        result
    }

    async fn apply_payment(&self, claim_id: Uuid, payment: PaymentDetails) -> BillingResult<Claim> {
        let (_guard, mut claim) = self
            .lock_claim(claim_id)
            .await?
            .ok_or(BillingError::ClaimNotFound(claim_id))?;
        if claim.is_paid() {
            return Err(BillingError::ClaimImmutable(claim_id));
        }
        payment.validate(claim.total_amount)?;

        let mut profile = self
            .repository
            .get_profile(&claim.patient_id)
            .await?
            .ok_or_else(|| BillingError::NoProfile {
                patient_id: claim.patient_id.clone(),
            })?;

        let previous = claim.status;
        claim.status = ClaimStatus::Paid;
        claim.paid_amount = Some(payment.amount);
        claim.allowed_amount = Some(payment.allowed_amount);
        claim.patient_responsibility = Some(payment.patient_responsibility);
        claim.payment_date = Some(payment.payment_date);
        claim.check_number = payment.check_number;
        profile.balance += payment.patient_responsibility;

        self.repository
            .commit(ChangeSet::new().with_profile(profile).with_claim(claim.clone()))
            .await?;

        info!(
            previous = %previous,
            paid = %payment.amount,
            patient_responsibility = %payment.patient_responsibility,
            "Payment processed"
        );
        self.events.payment_processed(&claim);
        Ok(claim)
    }

    /// Mark a submitted or processing claim denied
    #[instrument(skip(self, reason))]
    pub async fn deny_claim(&self, claim_id: Uuid, reason: &str) -> BillingResult<bool> {
        let reason = reason.to_string();
        self.transition(claim_id, ClaimStatus::Denied, move |claim| {
            claim.denial_reason = Some(reason);
        })
        .await
    }

    /// Re-open a denied claim for payer review
    #[instrument(skip(self))]
    pub async fn appeal_claim(&self, claim_id: Uuid) -> BillingResult<bool> {
        self.transition(claim_id, ClaimStatus::Appealed, |_| {}).await
    }

    /// Apply a payer status reported by poll or webhook
    #[instrument(skip(self, update))]
    pub async fn apply_status_update(&self, claim_id: Uuid, update: ClaimStatusUpdate) -> BillingResult<bool> {
        match update {
            ClaimStatusUpdate::Pending => Ok(false),
            ClaimStatusUpdate::Processing => self.transition(claim_id, ClaimStatus::Processing, |_| {}).await,
            ClaimStatusUpdate::Denied { reason } => self.deny_claim(claim_id, &reason).await,
        }
    }

    /// Ask the clearinghouse for the payer status of a submitted claim
    #[instrument(skip(self))]
    pub async fn poll_claim_status(&self, claim_id: Uuid) -> BillingResult<bool> {
        let claim = self
            .repository
            .get_claim(claim_id)
            .await?
            .ok_or(BillingError::ClaimNotFound(claim_id))?;
        let Some(claim_number) = claim.claim_number else {
            debug!("Claim has not been submitted, nothing to poll");
            return Ok(false);
        };

        match self.clearinghouse.claim_status(&claim_number).await {
            Ok(update) => self.apply_status_update(claim_id, update).await,
            Err(e) => {
                warn!(error = %self.redactor.redact(&e.to_string()), "Claim status poll failed");
                Ok(false)
            }
        }
    }

    /// Move a claim to `next` if the lifecycle allows it; `false` otherwise
    async fn transition<F>(&self, claim_id: Uuid, next: ClaimStatus, mutate: F) -> BillingResult<bool>
    where
        F: FnOnce(&mut Claim) + Send,
    {
        let Some((_guard, mut claim)) = self.lock_claim(claim_id).await? else {
            warn!(target_status = %next, "Transition requested for unknown claim");
            return Ok(false);
        };
        let previous = claim.status;
        if !previous.can_transition_to(next) {
            debug!(from = %previous, to = %next, "Ignoring transition not allowed by claim lifecycle");
            return Ok(false);
        }

        claim.status = next;
        mutate(&mut claim);
        self.repository.commit(ChangeSet::new().with_claim(claim.clone())).await?;

        info!(from = %previous, to = %next, "Claim status changed");
        self.events.claim_status_changed(&claim, previous);
        match next {
            ClaimStatus::Denied => {
                if let Some(reason) = &claim.denial_reason {
                    debug!(reason = %self.redactor.redact(reason), "Denial reason recorded");
                }
                self.events.claim_denied(&claim);
            }
            ClaimStatus::Appealed => self.events.claim_appealed(&claim),
            _ => {}
        }
        Ok(true)
    }
}

/// Units a claim draws from its authorization
fn total_units(sessions: &[BillableSession]) -> BillingResult<u32> {
    sessions
        .iter()
        .try_fold(0u32, |total, session| total.checked_add(session.units))
        .ok_or_else(|| BillingError::Validation("claim units exceed the countable range".to_string()))
}
