use crate::{
    config::{StorageBackend, StorageConfig},
    error::{BillingError, BillingResult},
    models::Claim,
};
use async_trait::async_trait;
use insurance_service::BillingProfile;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

pub mod sqlite;

pub use sqlite::SqliteBillingRepository;

/// Profiles and claims written together
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub profiles: Vec<BillingProfile>,
    pub claims: Vec<Claim>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: BillingProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.claims.is_empty()
    }
}

/// Consistent view of every stored record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingSnapshot {
    /// Ordered by patient id
    pub profiles: Vec<BillingProfile>,
    /// Ordered by creation
    pub claims: Vec<Claim>,
}

/// Storage of billing profiles and claims
#[async_trait]
pub trait BillingRepository: Send + Sync {
    async fn get_profile(&self, patient_id: &str) -> BillingResult<Option<BillingProfile>>;

    async fn get_claim(&self, claim_id: Uuid) -> BillingResult<Option<Claim>>;

    /// Claims of one patient, in creation order
    async fn claims_for_patient(&self, patient_id: &str) -> BillingResult<Vec<Claim>>;

    async fn snapshot(&self) -> BillingResult<BillingSnapshot>;

    /// Write every record of `changes` or none of them.
    ///
    /// Fails with `ClaimImmutable` when a claim stored as paid would change.
    async fn commit(&self, changes: ChangeSet) -> BillingResult<()>;
}

/// Paid claims accept only an identical rewrite
pub(crate) fn ensure_mutable(stored: &Claim, next: &Claim) -> BillingResult<()> {
    if stored.is_paid() && stored != next {
        return Err(BillingError::ClaimImmutable(stored.id));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MemoryState {
    profiles: HashMap<String, BillingProfile>,
    claims: HashMap<Uuid, Claim>,
    claim_order: Vec<Uuid>,
}

impl MemoryState {
    fn ordered_claims(&self) -> impl Iterator<Item = &Claim> {
        self.claim_order.iter().filter_map(|id| self.claims.get(id))
    }
}

/// In-memory repository for tests, demos and short-lived tooling
#[derive(Debug, Default)]
pub struct InMemoryBillingRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryBillingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BillingRepository for InMemoryBillingRepository {
    async fn get_profile(&self, patient_id: &str) -> BillingResult<Option<BillingProfile>> {
        Ok(self.state.read().profiles.get(patient_id).cloned())
    }

    async fn get_claim(&self, claim_id: Uuid) -> BillingResult<Option<Claim>> {
        Ok(self.state.read().claims.get(&claim_id).cloned())
    }

    async fn claims_for_patient(&self, patient_id: &str) -> BillingResult<Vec<Claim>> {
        let state = self.state.read();
        Ok(state
            .ordered_claims()
            .filter(|claim| claim.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn snapshot(&self) -> BillingResult<BillingSnapshot> {
        let state = self.state.read();
        let mut profiles: Vec<BillingProfile> = state.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.patient_id.cmp(&b.patient_id));
        Ok(BillingSnapshot {
            profiles,
            claims: state.ordered_claims().cloned().collect(),
        })
    }

    async fn commit(&self, changes: ChangeSet) -> BillingResult<()> {
        let mut state = self.state.write();

        // Check everything before touching the maps
        for claim in &changes.claims {
            if let Some(stored) = state.claims.get(&claim.id) {
                ensure_mutable(stored, claim)?;
            }
        }

        for profile in changes.profiles {
            state.profiles.insert(profile.patient_id.clone(), profile);
        }
        for claim in changes.claims {
            let id = claim.id;
            if state.claims.insert(id, claim).is_none() {
                state.claim_order.push(id);
            }
        }
        Ok(())
    }
}

/// Open the repository selected by `config`
pub async fn open_repository(config: &StorageConfig) -> BillingResult<Arc<dyn BillingRepository>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryBillingRepository::new())),
        StorageBackend::Sqlite => {
            let repository = SqliteBillingRepository::connect(&config.sqlite_path, config.max_connections).await?;
            Ok(Arc::new(repository))
        }
    }
}
