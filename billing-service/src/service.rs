use crate::{
    catalog::CptCatalog,
    claims::ClaimLifecycleEngine,
    clearinghouse::Clearinghouse,
    config::BillingConfig,
    error::{BillingError, BillingResult},
    events::BillingEvents,
    export::{export_csv, export_json, parse_json, ExportFormat},
    locks::PatientLocks,
    models::{Claim, ClaimStatusUpdate, CreateClaimOptions, PaymentDetails},
    profiles::{ensure_usage_preserved, ProfileStore},
    reporting::{generate_billing_report, BillingReport, ReportPeriod},
    repository::{BillingRepository, ChangeSet},
    sessions::SessionSource,
};
use chrono::{DateTime, Utc};
use events_bus::EventBus;
use insurance_service::{check_authorization_status, find_applicable_authorization, AuthorizationStatusReport, BillingProfile};
use logger_redacted::hash_identifier;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{info, instrument};
use uuid::Uuid;

/// Records loaded by [`BillingService::import_billing_data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub profiles: usize,
    pub claims: usize,
}

/// Entry point of the billing engine.
///
/// Collaborators are injected; nothing here is process-global, so each test
/// or tenant can run its own instance.
pub struct BillingService {
    config: BillingConfig,
    repository: Arc<dyn BillingRepository>,
    catalog: Arc<CptCatalog>,
    locks: Arc<PatientLocks>,
    profiles: ProfileStore,
    claims: ClaimLifecycleEngine,
    events: BillingEvents,
}

impl BillingService {
    pub fn new(
        config: BillingConfig,
        repository: Arc<dyn BillingRepository>,
        sessions: Arc<dyn SessionSource>,
        clearinghouse: Arc<dyn Clearinghouse>,
        bus: EventBus,
    ) -> Self {
        Self::with_catalog(config, repository, sessions, clearinghouse, bus, Arc::new(CptCatalog::standard()))
    }

    pub fn with_catalog(
        config: BillingConfig,
        repository: Arc<dyn BillingRepository>,
        sessions: Arc<dyn SessionSource>,
        clearinghouse: Arc<dyn Clearinghouse>,
        bus: EventBus,
        catalog: Arc<CptCatalog>,
    ) -> Self {
        let events = BillingEvents::new(bus);
        let locks = Arc::new(PatientLocks::new());
        let profiles = ProfileStore::new(repository.clone(), locks.clone(), events.clone());
        let claims = ClaimLifecycleEngine::new(
            repository.clone(),
            sessions,
            clearinghouse,
            catalog.clone(),
            locks.clone(),
            events.clone(),
            config.authorization,
        );

        Self {
            config,
            repository,
            catalog,
            locks,
            profiles,
            claims,
            events,
        }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CptCatalog {
        &self.catalog
    }

    pub fn event_bus(&self) -> &EventBus {
        self.events.bus()
    }

    pub async fn upsert_profile(&self, profile: BillingProfile) -> BillingResult<()> {
        self.profiles.upsert(profile).await
    }

    pub async fn get_profile(&self, patient_id: &str) -> BillingResult<Option<BillingProfile>> {
        self.profiles.get(patient_id).await
    }

    pub async fn get_claim(&self, claim_id: Uuid) -> BillingResult<Option<Claim>> {
        self.repository.get_claim(claim_id).await
    }

    pub async fn claims_for_patient(&self, patient_id: &str) -> BillingResult<Vec<Claim>> {
        self.repository.claims_for_patient(patient_id).await
    }

    pub async fn create_claim(
        &self,
        patient_id: &str,
        session_ids: &[String],
        options: CreateClaimOptions,
    ) -> BillingResult<Claim> {
        self.claims.create_claim(patient_id, session_ids, options).await
    }

    pub async fn submit_claim(&self, claim_id: Uuid) -> BillingResult<bool> {
        self.claims.submit_claim(claim_id).await
    }

    pub async fn process_payment(&self, claim_id: Uuid, payment: PaymentDetails) -> BillingResult<Claim> {
        self.claims.process_payment(claim_id, payment).await
    }

    pub async fn deny_claim(&self, claim_id: Uuid, reason: &str) -> BillingResult<bool> {
        self.claims.deny_claim(claim_id, reason).await
    }

    pub async fn appeal_claim(&self, claim_id: Uuid) -> BillingResult<bool> {
        self.claims.appeal_claim(claim_id).await
    }

    pub async fn poll_claim_status(&self, claim_id: Uuid) -> BillingResult<bool> {
        self.claims.poll_claim_status(claim_id).await
    }

    /// Webhook entry point for payer status changes
    pub async fn apply_status_update(&self, claim_id: Uuid, update: ClaimStatusUpdate) -> BillingResult<bool> {
        self.claims.apply_status_update(claim_id, update).await
    }

    /// Authorization state of a patient as of now
    #[instrument(skip(self), fields(patient = %hash_identifier(patient_id)))]
    pub async fn check_authorization_status(&self, patient_id: &str) -> BillingResult<AuthorizationStatusReport> {
        let now = Utc::now();
        let profile = self.repository.get_profile(patient_id).await?;
        let report = check_authorization_status(profile.as_ref(), now, &self.config.authorization);

        if report.has_active && !report.warnings.is_empty() {
            if let Some(authorization) = profile
                .as_ref()
                .and_then(|profile| find_applicable_authorization(profile, now))
            {
                self.events.authorization_near_limit(patient_id, authorization);
            }
        }
        Ok(report)
    }

    pub async fn generate_billing_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BillingResult<BillingReport> {
        self.generate_billing_report_at(start, end, Utc::now()).await
    }

    /// Report over claims with a date of service in `[start, end]`, aged as of `now`
    #[instrument(skip(self))]
    pub async fn generate_billing_report_at(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> BillingResult<BillingReport> {
        if start > end {
            return Err(BillingError::Validation("report start is after report end".to_string()));
        }

        let snapshot = self.repository.snapshot().await?;
        let report = generate_billing_report(
            &snapshot.claims,
            &snapshot.profiles,
            ReportPeriod { start, end },
            now,
            &self.config.projection,
        );
        info!(claims = report.summary.total_claims, "Billing report generated");
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn export_billing_data(&self, format: ExportFormat) -> BillingResult<String> {
        let snapshot = self.repository.snapshot().await?;
        info!(
            profiles = snapshot.profiles.len(),
            claims = snapshot.claims.len(),
            "Exporting billing data"
        );
        match format {
            ExportFormat::Json => export_json(snapshot),
            ExportFormat::Csv => export_csv(&snapshot.claims),
        }
    }

    /// Load a JSON export. All records are written in one commit under the
    /// locks of every patient involved. The whole load fails if a paid claim on
    /// file would differ, or if a profile would give back authorization units
    /// that stored claims already consumed.
    #[instrument(skip(self, data))]
    pub async fn import_billing_data(&self, data: &str) -> BillingResult<ImportSummary> {
        let snapshot = parse_json(data)?;
        for profile in &snapshot.profiles {
            profile.validate()?;
        }

        // Sorted acquisition so a concurrent import cannot deadlock with this one
        let patients: BTreeSet<&str> = snapshot
            .profiles
            .iter()
            .map(|profile| profile.patient_id.as_str())
            .chain(snapshot.claims.iter().map(|claim| claim.patient_id.as_str()))
            .collect();
        let mut guards = Vec::with_capacity(patients.len());
        for patient_id in patients {
            guards.push(self.locks.lock(patient_id).await);
        }

        for profile in &snapshot.profiles {
            if let Some(stored) = self.repository.get_profile(&profile.patient_id).await? {
                ensure_usage_preserved(&stored, profile)?;
            }
        }

        let summary = ImportSummary {
            profiles: snapshot.profiles.len(),
            claims: snapshot.claims.len(),
        };
        self.repository
            .commit(ChangeSet {
                profiles: snapshot.profiles,
                claims: snapshot.claims,
            })
            .await?;

        info!(profiles = summary.profiles, claims = summary.claims, "Billing data imported");
        Ok(summary)
    }
}
