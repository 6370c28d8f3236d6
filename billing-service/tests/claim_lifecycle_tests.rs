//! Claim lifecycle workflow tests
//!
//! These tests drive the billing engine the way a therapy practice does:
//! 1. Draft claims against a prior authorization (enough and too few units)
//! 2. Submission to the clearinghouse, including outages
//! 3. Payment posting and patient balance
//! 4. Denial, appeal and payer status updates
//! 5. Unit consumption under sequential and concurrent claim creation

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use billing_service::*;
use chrono::{DateTime, Duration, Utc};
use events_bus::EventBus;
use insurance_service::{Authorization, AuthorizationStatus, BillingProfile, InsuranceInfo, UnitType};
use rust_decimal::Decimal;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use uuid::Uuid;

const PATIENT: &str = "patient-0042";

struct Harness {
    service: Arc<BillingService>,
    sessions: Arc<InMemorySessionSource>,
    clearinghouse: Arc<SimulatedClearinghouse>,
    bus: EventBus,
}

fn harness() -> Harness {
    harness_with(Arc::new(InMemoryBillingRepository::new()))
}

fn harness_with(repository: Arc<dyn BillingRepository>) -> Harness {
    let bus = EventBus::new(256);
    let sessions = Arc::new(InMemorySessionSource::new());
    let clearinghouse = Arc::new(SimulatedClearinghouse::default());
    let service = Arc::new(BillingService::new(
        BillingConfig::default(),
        repository,
        sessions.clone(),
        clearinghouse.clone(),
        bus.clone(),
    ));
    Harness {
        service,
        sessions,
        clearinghouse,
        bus,
    }
}

fn authorization(total: u32, used: u32) -> Authorization {
    let now = Utc::now();
    let mut auth = Authorization::new("AUTH-2024-001", now - Duration::days(60), now + Duration::days(120), total, UnitType::Sessions);
    auth.used_units = used;
    auth
}

fn profile(auth: Authorization) -> BillingProfile {
    let mut insurance = InsuranceInfo::new("Blue Cross", "POL-123456", Utc::now() - Duration::days(365));
    insurance.subscriber_id = "SUB-998877".into();
    BillingProfile::new(PATIENT, insurance).with_authorization(auth)
}

/// In-memory store that refuses every commit after the first `allowed`
struct FailingStore {
    inner: InMemoryBillingRepository,
    allowed: AtomicUsize,
}

impl FailingStore {
    fn after(allowed: usize) -> Self {
        Self {
            inner: InMemoryBillingRepository::new(),
            allowed: AtomicUsize::new(allowed),
        }
    }
}

#[async_trait::async_trait]
impl BillingRepository for FailingStore {
    async fn get_profile(&self, patient_id: &str) -> BillingResult<Option<BillingProfile>> {
        self.inner.get_profile(patient_id).await
    }

    async fn get_claim(&self, claim_id: Uuid) -> BillingResult<Option<Claim>> {
        self.inner.get_claim(claim_id).await
    }

    async fn claims_for_patient(&self, patient_id: &str) -> BillingResult<Vec<Claim>> {
        self.inner.claims_for_patient(patient_id).await
    }

    async fn snapshot(&self) -> BillingResult<BillingSnapshot> {
        self.inner.snapshot().await
    }

    async fn commit(&self, changes: ChangeSet) -> BillingResult<()> {
        if self
            .allowed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
        {
            return Err(BillingError::Storage("database is locked".into()));
        }
        self.inner.commit(changes).await
    }
}

impl Harness {
    /// Register one session with an explicit code and date
    fn add_session(&self, id: &str, cpt_code: &str, duration_minutes: u32, date: DateTime<Utc>) -> String {
        self.sessions.insert(SessionRecord {
            session_id: id.to_string(),
            patient_id: PATIENT.to_string(),
            date,
            duration_minutes,
            cpt_code: cpt_code.to_string(),
            modifiers: Vec::new(),
        });
        id.to_string()
    }

    /// Register `count` individual treatment sessions and return their ids
    fn add_sessions(&self, prefix: &str, count: usize, date: DateTime<Utc>) -> Vec<String> {
        (0..count)
            .map(|i| {
                let id = format!("{}-{}", prefix, i);
                self.sessions.insert(SessionRecord {
                    session_id: id.clone(),
                    patient_id: PATIENT.to_string(),
                    date: date + Duration::minutes(i as i64),
                    duration_minutes: 45,
                    cpt_code: "92507".to_string(),
                    modifiers: vec!["GN".to_string()],
                });
                id
            })
            .collect()
    }

    async fn auth_usage(&self) -> (u32, AuthorizationStatus) {
        let profile = self.service.get_profile(PATIENT).await.unwrap().unwrap();
        let auth = &profile.authorizations[0];
        (auth.used_units, auth.status)
    }

    async fn draft_claim(&self, prefix: &str, sessions: usize) -> Claim {
        let ids = self.add_sessions(prefix, sessions, Utc::now() - Duration::days(1));
        self.service
            .create_claim(PATIENT, &ids, CreateClaimOptions::default())
            .await
            .unwrap()
    }

    fn payment(&self) -> PaymentDetails {
        PaymentDetails {
            amount: Decimal::from(150),
            allowed_amount: Decimal::from(120),
            patient_responsibility: Decimal::from(30),
            check_number: Some("CHK-5521".into()),
            payment_date: Utc::now(),
        }
    }
}

// ============================================================================
// Claim creation against an authorization
// ============================================================================

#[tokio::test]
async fn test_claim_within_remaining_units_is_drafted() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 8))).await.unwrap();

    let claim = h.draft_claim("a", 1).await;

    assert_eq!(claim.status, ClaimStatus::Draft);
    assert_eq!(claim.total_amount, Decimal::new(15000, 2));
    assert_eq!(claim.units(), 1);
    assert!(claim.claim_number.is_none());
    assert_eq!(h.auth_usage().await, (9, AuthorizationStatus::Active));
}

#[tokio::test]
async fn test_claim_exceeding_remaining_units_fails_without_consuming() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 8))).await.unwrap();
    let ids = h.add_sessions("b", 3, Utc::now() - Duration::days(1));

    let result = h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await;

    match result {
        Err(BillingError::InsufficientUnits { remaining, needed, .. }) => {
            assert_eq!(remaining, 2);
            assert_eq!(needed, 3);
        }
        other => panic!("expected InsufficientUnits, got {:?}", other),
    }
    assert_eq!(h.auth_usage().await, (8, AuthorizationStatus::Active));
    assert!(h.service.claims_for_patient(PATIENT).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_preconditions_are_reported_in_order() {
    let h = harness();
    let ids = h.add_sessions("c", 1, Utc::now() - Duration::days(1));

    let no_profile = h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await;
    assert!(matches!(no_profile, Err(BillingError::NoProfile { .. })));

    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let unknown = vec!["missing-session".to_string()];
    let no_sessions = h.service.create_claim(PATIENT, &unknown, CreateClaimOptions::default()).await;
    assert!(matches!(no_sessions, Err(BillingError::NoBillableSessions { requested: 1 })));

    let old = h.add_sessions("old", 1, Utc::now() - Duration::days(200));
    let no_auth = h.service.create_claim(PATIENT, &old, CreateClaimOptions::default()).await;
    let err = no_auth.unwrap_err();
    assert!(matches!(err, BillingError::NoAuthorization { .. }));
    assert!(err.is_precondition_failure());
}

#[tokio::test]
async fn test_authorization_exhausts_and_blocks_next_claim() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(2, 0))).await.unwrap();
    let mut exhausted = h.bus.subscribe("billing.authorization.exhausted").unwrap();

    h.draft_claim("first", 2).await;
    assert_eq!(h.auth_usage().await, (2, AuthorizationStatus::Exhausted));
    assert!(exhausted.try_next().is_some());

    let ids = h.add_sessions("second", 2, Utc::now() - Duration::days(1));
    let second = h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await;
    assert!(matches!(second, Err(BillingError::NoAuthorization { .. })));
    assert_eq!(h.auth_usage().await, (2, AuthorizationStatus::Exhausted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_never_double_spend() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(2, 0))).await.unwrap();

    let batches: Vec<Vec<String>> = (0..8)
        .map(|i| h.add_sessions(&format!("race{}", i), 2, Utc::now() - Duration::days(1)))
        .collect();

    let tasks: Vec<_> = batches
        .into_iter()
        .map(|ids| {
            let service = h.service.clone();
            tokio::spawn(async move { service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert!(matches!(e, BillingError::NoAuthorization { .. }), "unexpected error {:?}", e),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(h.auth_usage().await, (2, AuthorizationStatus::Exhausted));
    assert_eq!(h.service.claims_for_patient(PATIENT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_cannot_be_billed_twice() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let ids = h.add_sessions("dup", 1, Utc::now() - Duration::days(1));

    h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await.unwrap();
    let again = h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await;

    assert!(matches!(again, Err(BillingError::NoBillableSessions { .. })));
    assert_eq!(h.auth_usage().await.0, 1);
}

#[tokio::test]
async fn test_authorization_code_restriction() {
    let h = harness();
    let mut auth = authorization(10, 0);
    auth.cpt_codes = vec!["92609".into()];
    h.service.upsert_profile(profile(auth)).await.unwrap();
    let ids = h.add_sessions("restricted", 1, Utc::now() - Duration::days(1));

    let result = h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await;

    assert!(matches!(result, Err(BillingError::NoAuthorization { .. })));
    assert_eq!(h.auth_usage().await.0, 0);
}

#[tokio::test]
async fn test_mixed_codes_and_dates_on_one_claim() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(20, 0))).await.unwrap();
    let now = Utc::now();
    let ids = vec![
        h.add_session("eval", "92521", 60, now - Duration::days(10)),
        h.add_session("tx", "92507", 45, now - Duration::days(2)),
        h.add_session("cog", "97130", 45, now - Duration::days(2) + Duration::hours(1)),
    ];

    let claim = h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await.unwrap();

    assert_eq!(claim.sessions.len(), 3);
    assert_eq!(claim.date_of_service, now - Duration::days(10));
    assert_eq!(claim.units(), 5);
    // 165.00 + 150.00 + 3 x 35.00
    assert_eq!(claim.total_amount, Decimal::new(42000, 2));
    assert_eq!(h.auth_usage().await.0, 5);
}

#[tokio::test]
async fn test_claim_is_never_dated_outside_its_authorization() {
    let h = harness();
    let now = Utc::now();
    let mut auth = Authorization::new("AUTH-LAPSED", now - Duration::days(20), now - Duration::days(5), 10, UnitType::Sessions);
    auth.cpt_codes = vec!["92507".into()];
    h.service.upsert_profile(profile(auth)).await.unwrap();
    // First session is in the window but not an authorized code; the authorized code is after the window
    let ids = vec![
        h.add_session("in-window", "92521", 60, now - Duration::days(10)),
        h.add_session("late", "92507", 45, now - Duration::days(1)),
    ];

    let result = h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await;

    assert!(matches!(result, Err(BillingError::NoAuthorization { .. })), "got {:?}", result);
    assert_eq!(h.auth_usage().await.0, 0);
    assert!(h.service.claims_for_patient(PATIENT).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sessions_after_authorization_end_are_left_unbilled() {
    let h = harness();
    let now = Utc::now();
    let auth = Authorization::new("AUTH-SHORT", now - Duration::days(20), now - Duration::days(5), 10, UnitType::Sessions);
    h.service.upsert_profile(profile(auth)).await.unwrap();
    let ids = vec![
        h.add_session("covered", "92507", 45, now - Duration::days(10)),
        h.add_session("uncovered", "92507", 45, now - Duration::days(1)),
    ];

    let claim = h.service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await.unwrap();

    assert_eq!(claim.sessions.len(), 1);
    assert!(claim.contains_session("covered"));
    assert!(!claim.contains_session("uncovered"));
    assert_eq!(h.auth_usage().await.0, 1);
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn test_submit_assigns_claim_number() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let claim = h.draft_claim("s", 1).await;

    assert!(h.service.submit_claim(claim.id).await.unwrap());

    let submitted = h.service.get_claim(claim.id).await.unwrap().unwrap();
    assert_eq!(submitted.status, ClaimStatus::Submitted);
    assert!(!submitted.claim_number.clone().unwrap().is_empty());
    let submitted_at = submitted.date_submitted.unwrap();
    assert!((Utc::now() - submitted_at).num_seconds().abs() < 5);
}

#[tokio::test]
async fn test_second_submit_is_a_no_op() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let claim = h.draft_claim("s", 1).await;

    assert!(h.service.submit_claim(claim.id).await.unwrap());
    let first = h.service.get_claim(claim.id).await.unwrap().unwrap();

    assert!(!h.service.submit_claim(claim.id).await.unwrap());
    let second = h.service.get_claim(claim.id).await.unwrap().unwrap();
    assert_eq!(first.claim_number, second.claim_number);
    assert_eq!(first.date_submitted, second.date_submitted);

    assert!(!h.service.submit_claim(uuid::Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn test_clearinghouse_outage_leaves_draft() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let claim = h.draft_claim("s", 1).await;
    h.clearinghouse.fail_next_submissions(1);

    assert!(!h.service.submit_claim(claim.id).await.unwrap());
    let unchanged = h.service.get_claim(claim.id).await.unwrap().unwrap();
    assert_eq!(unchanged, claim);

    assert!(h.service.submit_claim(claim.id).await.unwrap());
}

#[tokio::test]
async fn test_submit_immediately() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let ids = h.add_sessions("now", 2, Utc::now() - Duration::days(1));

    let claim = h
        .service
        .create_claim(PATIENT, &ids, CreateClaimOptions { submit_immediately: true })
        .await
        .unwrap();

    assert_eq!(claim.status, ClaimStatus::Submitted);
    assert!(claim.claim_number.is_some());
    assert_eq!(h.auth_usage().await.0, 2);
}

#[tokio::test]
async fn test_submit_immediately_outage_keeps_draft_and_units() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    h.clearinghouse.fail_next_submissions(1);
    let ids = h.add_sessions("later", 1, Utc::now() - Duration::days(1));

    let claim = h
        .service
        .create_claim(PATIENT, &ids, CreateClaimOptions { submit_immediately: true })
        .await
        .unwrap();

    assert_eq!(claim.status, ClaimStatus::Draft);
    assert_eq!(h.auth_usage().await.0, 1);
}

#[tokio::test]
async fn test_submit_immediately_storage_failure_returns_draft() {
    // profile upsert and draft commit succeed, the submission commit fails
    let h = harness_with(Arc::new(FailingStore::after(2)));
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let ids = h.add_sessions("flaky", 1, Utc::now() - Duration::days(1));

    let claim = h
        .service
        .create_claim(PATIENT, &ids, CreateClaimOptions { submit_immediately: true })
        .await
        .unwrap();

    assert_eq!(claim.status, ClaimStatus::Draft);
    assert_eq!(h.service.get_claim(claim.id).await.unwrap(), Some(claim));
    assert_eq!(h.auth_usage().await.0, 1);
}

// ============================================================================
// Backup import against a live store
// ============================================================================

#[tokio::test]
async fn test_stale_backup_cannot_give_back_consumed_units() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let stale = h.service.export_billing_data(ExportFormat::Json).await.unwrap();

    h.draft_claim("after-backup", 1).await;
    let result = h.service.import_billing_data(&stale).await;

    assert!(matches!(result, Err(BillingError::Validation(_))), "got {:?}", result);
    assert_eq!(h.auth_usage().await, (1, AuthorizationStatus::Active));
    assert_eq!(h.service.claims_for_patient(PATIENT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_current_backup_reimports_cleanly() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    h.draft_claim("kept", 2).await;
    let current = h.service.export_billing_data(ExportFormat::Json).await.unwrap();

    let summary = h.service.import_billing_data(&current).await.unwrap();

    assert_eq!(summary, ImportSummary { profiles: 1, claims: 1 });
    assert_eq!(h.auth_usage().await.0, 2);
}

// ============================================================================
// Payment
// ============================================================================

#[tokio::test]
async fn test_payment_marks_paid_and_updates_balance() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let claim = h.draft_claim("p", 1).await;
    h.service.submit_claim(claim.id).await.unwrap();
    let mut payments = h.bus.subscribe("billing.payment.*").unwrap();

    let paid = h.service.process_payment(claim.id, h.payment()).await.unwrap();

    assert_eq!(paid.status, ClaimStatus::Paid);
    assert_eq!(paid.paid_amount, Some(Decimal::from(150)));
    assert_eq!(paid.allowed_amount, Some(Decimal::from(120)));
    assert_eq!(paid.patient_responsibility, Some(Decimal::from(30)));
    assert_eq!(paid.check_number.as_deref(), Some("CHK-5521"));

    let profile = h.service.get_profile(PATIENT).await.unwrap().unwrap();
    assert_eq!(profile.balance, Decimal::from(30));
    assert_eq!(payments.try_next().unwrap().data_str("claimId"), Some(claim.id.to_string().as_str()));
}

#[tokio::test]
async fn test_paid_claim_is_immutable() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let claim = h.draft_claim("p", 1).await;
    h.service.process_payment(claim.id, h.payment()).await.unwrap();

    let again = h.service.process_payment(claim.id, h.payment()).await;
    assert!(matches!(again, Err(BillingError::ClaimImmutable(_))));
    assert!(!h.service.deny_claim(claim.id, "late denial").await.unwrap());
    assert!(!h.service.submit_claim(claim.id).await.unwrap());

    let profile = h.service.get_profile(PATIENT).await.unwrap().unwrap();
    assert_eq!(profile.balance, Decimal::from(30));
}

#[tokio::test]
async fn test_invalid_payment_is_rejected() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let claim = h.draft_claim("p", 1).await;

    let mut overpaid = h.payment();
    overpaid.amount = Decimal::from(500);
    assert!(matches!(
        h.service.process_payment(claim.id, overpaid).await,
        Err(BillingError::Validation(_))
    ));
    assert!(matches!(
        h.service.process_payment(uuid::Uuid::new_v4(), h.payment()).await,
        Err(BillingError::ClaimNotFound(_))
    ));
    assert_eq!(h.service.get_claim(claim.id).await.unwrap().unwrap().status, ClaimStatus::Draft);
}

// ============================================================================
// Denial, appeal and payer status
// ============================================================================

#[tokio::test]
async fn test_denial_and_appeal_flow() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let claim = h.draft_claim("d", 1).await;

    // Drafts cannot be denied or appealed
    assert!(!h.service.deny_claim(claim.id, "Missing modifier").await.unwrap());
    assert!(!h.service.appeal_claim(claim.id).await.unwrap());

    h.service.submit_claim(claim.id).await.unwrap();
    assert!(h.service.deny_claim(claim.id, "Missing modifier").await.unwrap());
    let denied = h.service.get_claim(claim.id).await.unwrap().unwrap();
    assert_eq!(denied.status, ClaimStatus::Denied);
    assert_eq!(denied.denial_reason.as_deref(), Some("Missing modifier"));

    assert!(h.service.appeal_claim(claim.id).await.unwrap());
    assert!(!h.service.appeal_claim(claim.id).await.unwrap());

    assert!(h
        .service
        .apply_status_update(claim.id, ClaimStatusUpdate::Processing)
        .await
        .unwrap());
    assert_eq!(
        h.service.get_claim(claim.id).await.unwrap().unwrap().status,
        ClaimStatus::Processing
    );
}

#[tokio::test]
async fn test_poll_applies_clearinghouse_status() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 0))).await.unwrap();
    let claim = h.draft_claim("poll", 1).await;

    // Nothing to poll before submission
    assert!(!h.service.poll_claim_status(claim.id).await.unwrap());

    h.service.submit_claim(claim.id).await.unwrap();
    assert!(!h.service.poll_claim_status(claim.id).await.unwrap());

    let number = h.service.get_claim(claim.id).await.unwrap().unwrap().claim_number.unwrap();
    h.clearinghouse.set_status(&number, ClaimStatusUpdate::Processing);
    assert!(h.service.poll_claim_status(claim.id).await.unwrap());

    h.clearinghouse.set_status(
        &number,
        ClaimStatusUpdate::Denied {
            reason: "Service not covered".into(),
        },
    );
    assert!(h.service.poll_claim_status(claim.id).await.unwrap());
    let denied = h.service.get_claim(claim.id).await.unwrap().unwrap();
    assert_eq!(denied.status, ClaimStatus::Denied);
    assert_eq!(denied.denial_reason.as_deref(), Some("Service not covered"));
}

// ============================================================================
// Authorization status and events
// ============================================================================

#[tokio::test]
async fn test_authorization_status_warns_and_publishes() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(10, 5))).await.unwrap();
    let mut near_limit = h.bus.subscribe("billing.authorization.near_limit").unwrap();

    let report = h.service.check_authorization_status(PATIENT).await.unwrap();

    assert!(report.has_active);
    assert_eq!(report.units_remaining, 5);
    assert_eq!(report.authorization_number.as_deref(), Some("AUTH-2024-001"));
    assert!(report.warnings.iter().any(|w| w.contains("5 authorized units")));
    assert!(near_limit.try_next().is_some());

    let missing = h.service.check_authorization_status("nobody").await.unwrap();
    assert!(!missing.has_active);
    assert_eq!(missing.warnings, vec!["No billing profile on file".to_string()]);
}

#[tokio::test]
async fn test_lifecycle_events_are_published_in_order() {
    let h = harness();
    h.service.upsert_profile(profile(authorization(20, 0))).await.unwrap();
    let mut events = h.bus.subscribe("billing.claim.*").unwrap();

    let claim = h.draft_claim("ev", 1).await;
    h.service.submit_claim(claim.id).await.unwrap();
    h.service.deny_claim(claim.id, "Duplicate").await.unwrap();
    h.service.appeal_claim(claim.id).await.unwrap();

    let published: Vec<String> = events.drain().into_iter().map(|event| event.topic).collect();
    assert_eq!(
        published,
        vec![
            topics::CLAIM_CREATED,
            topics::CLAIM_SUBMITTED,
            topics::CLAIM_STATUS_CHANGED,
            topics::CLAIM_DENIED,
            topics::CLAIM_STATUS_CHANGED,
            topics::CLAIM_APPEALED,
        ]
    );
}
