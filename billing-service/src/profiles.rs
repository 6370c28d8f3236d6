use crate::{
    error::{BillingError, BillingResult},
    events::BillingEvents,
    locks::PatientLocks,
    repository::{BillingRepository, ChangeSet},
};
use insurance_service::{AuthorizationStatus, BillingProfile};
use logger_redacted::hash_identifier;
use std::sync::Arc;
use tracing::info;

/// Write access to billing profiles
pub struct ProfileStore {
    repository: Arc<dyn BillingRepository>,
    locks: Arc<PatientLocks>,
    events: BillingEvents,
}

impl ProfileStore {
    pub fn new(repository: Arc<dyn BillingRepository>, locks: Arc<PatientLocks>, events: BillingEvents) -> Self {
        Self {
            repository,
            locks,
            events,
        }
    }

    /// Create or fully replace a patient's profile.
    ///
    /// Authorization usage recorded by claims cannot be rolled back through
    /// an upsert: an authorization already on file keeps at least its used
    /// units, and an exhausted one stays exhausted.
    pub async fn upsert(&self, profile: BillingProfile) -> BillingResult<()> {
        profile.validate()?;

        let _guard = self.locks.lock(&profile.patient_id).await;
        if let Some(existing) = self.repository.get_profile(&profile.patient_id).await? {
            ensure_usage_preserved(&existing, &profile)?;
        }

        self.repository
            .commit(ChangeSet::new().with_profile(profile.clone()))
            .await?;

        info!(
            patient = %hash_identifier(&profile.patient_id),
            authorizations = profile.authorizations.len(),
            "Billing profile stored"
        );
        self.events.profile_upserted(&profile);
        Ok(())
    }

    pub async fn get(&self, patient_id: &str) -> BillingResult<Option<BillingProfile>> {
        self.repository.get_profile(patient_id).await
    }
}

/// Usage already drawn by claims must survive a replacement profile.
///
/// Shared by profile upserts and backup imports.
pub(crate) fn ensure_usage_preserved(existing: &BillingProfile, next: &BillingProfile) -> BillingResult<()> {
    if let Some(dropped) = existing
        .authorizations
        .iter()
        .find(|stored| stored.used_units > 0 && next.authorization(stored.id).is_none())
    {
        return Err(BillingError::Validation(format!(
            "authorization {} has used units and cannot be removed",
            dropped.auth_number
        )));
    }
    for authorization in &next.authorizations {
        let Some(stored) = existing.authorization(authorization.id) else {
            continue;
        };
        if authorization.used_units < stored.used_units {
            return Err(BillingError::Validation(format!(
                "authorization {} cannot lower used units from {} to {}",
                stored.auth_number, stored.used_units, authorization.used_units
            )));
        }
        if stored.status == AuthorizationStatus::Exhausted && authorization.status != AuthorizationStatus::Exhausted {
            return Err(BillingError::Validation(format!(
                "authorization {} is exhausted",
                stored.auth_number
            )));
        }
    }
    Ok(())
}
