use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Idle mutexes are pruned once this many patients have entries
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per patient.
///
/// Every read-modify-write of a patient's profile or claims runs under the
/// patient's lock, so concurrent claim creation cannot double-spend units.
/// Entries are created on first use; past [`PRUNE_THRESHOLD`] patients the
/// ones nobody holds or waits on are dropped again.
#[derive(Debug, Default)]
pub struct PatientLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PatientLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, patient_id: &str) -> OwnedMutexGuard<()> {
        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune_idle();
        }
        // Clone out of the map so no shard lock is held across the await
        let mutex = self.locks.entry(patient_id.to_string()).or_default().clone();
        mutex.lock_owned().await
    }

    /// Remove mutexes with no holder and no waiter.
    ///
    /// A holder or waiter keeps its own `Arc`, and `retain` runs under the
    /// shard lock that `lock` also takes, so a live mutex is never dropped.
    pub fn prune_idle(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    /// Patients with a mutex entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
