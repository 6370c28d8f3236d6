use crate::{
    config::ClearinghouseConfig,
    models::{Claim, ClaimStatusUpdate},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClearinghouseError {
    #[error("Clearinghouse rejected the claim: {0}")]
    Rejected(String),

    #[error("Clearinghouse unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown claim number {0}")]
    UnknownClaim(String),
}

/// Acknowledgement of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub claim_number: String,
    pub accepted_at: DateTime<Utc>,
}

/// Electronic claim submission endpoint
#[async_trait]
pub trait Clearinghouse: Send + Sync {
    async fn submit(&self, claim: &Claim) -> Result<SubmissionReceipt, ClearinghouseError>;

    /// Payer-side status of a previously submitted claim
    async fn claim_status(&self, claim_number: &str) -> Result<ClaimStatusUpdate, ClearinghouseError>;
}

/// Clearinghouse stand-in that accepts every claim after a fixed delay
pub struct SimulatedClearinghouse {
    delay: Duration,
    prefix: String,
    statuses: DashMap<String, ClaimStatusUpdate>,
    failures_remaining: AtomicU32,
}

impl SimulatedClearinghouse {
    pub fn new(config: &ClearinghouseConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.submission_delay_ms),
            prefix: config.claim_number_prefix.clone(),
            statuses: DashMap::new(),
            failures_remaining: AtomicU32::new(0),
        }
    }

    /// Make the next `count` submissions fail as unavailable
    pub fn fail_next_submissions(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Set the status later polls report for `claim_number`
    pub fn set_status(&self, claim_number: &str, update: ClaimStatusUpdate) {
        self.statuses.insert(claim_number.to_string(), update);
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }

    fn next_claim_number(&self, now: DateTime<Utc>) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{}-{}-{:06}", self.prefix, now.format("%Y%m%d"), suffix)
    }
}

impl Default for SimulatedClearinghouse {
    fn default() -> Self {
        Self::new(&ClearinghouseConfig::default())
    }
}

#[async_trait]
impl Clearinghouse for SimulatedClearinghouse {
    async fn submit(&self, claim: &Claim) -> Result<SubmissionReceipt, ClearinghouseError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.take_failure() {
            return Err(ClearinghouseError::Unavailable("simulated outage".to_string()));
        }

        let accepted_at = Utc::now();
        let claim_number = self.next_claim_number(accepted_at);
        self.statuses.insert(claim_number.clone(), ClaimStatusUpdate::Pending);
        debug!(claim_id = %claim.id, claim_number = %claim_number, "Simulated clearinghouse accepted claim");

        Ok(SubmissionReceipt {
            claim_number,
            accepted_at,
        })
    }

    async fn claim_status(&self, claim_number: &str) -> Result<ClaimStatusUpdate, ClearinghouseError> {
        self.statuses
            .get(claim_number)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ClearinghouseError::UnknownClaim(claim_number.to_string()))
    }
}
