//! Reporting, export and persistence tests
//!
//! Runs the billing service against the SQLite store and checks that what
//! the office reads back (reports, CSV, JSON backups, audit trail) matches
//! what the claim workflow wrote.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use audit_engine::AuditEngine;
use billing_service::*;
use chrono::{DateTime, Duration, Utc};
use events_bus::EventBus;
use insurance_service::{Authorization, BillingProfile, InsuranceInfo, UnitType};
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

const PATIENT: &str = "patient-0107";

fn profile(patient_id: &str, provider: &str) -> BillingProfile {
    let now = Utc::now();
    BillingProfile::new(patient_id, InsuranceInfo::new(provider, "POL-4455", now - Duration::days(365)))
        .with_authorization(Authorization::new(
            "AUTH-77",
            now - Duration::days(90),
            now + Duration::days(90),
            30,
            UnitType::Sessions,
        ))
}

fn service_with(repository: Arc<dyn BillingRepository>, sessions: Arc<InMemorySessionSource>, bus: EventBus) -> BillingService {
    BillingService::new(
        BillingConfig::default(),
        repository,
        sessions,
        Arc::new(SimulatedClearinghouse::default()),
        bus,
    )
}

fn session(sessions: &InMemorySessionSource, id: &str, date: DateTime<Utc>) -> Vec<String> {
    sessions.insert(SessionRecord {
        session_id: id.to_string(),
        patient_id: PATIENT.to_string(),
        date,
        duration_minutes: 45,
        cpt_code: "92507".to_string(),
        modifiers: Vec::new(),
    });
    vec![id.to_string()]
}

/// Claim for `amount` submitted `days_ago` days before now
fn submitted_claim(amount: i64, days_ago: i64) -> Claim {
    let submitted = Utc::now() - Duration::days(days_ago);
    let line = BillableSession {
        session_id: format!("hist-{}", uuid::Uuid::new_v4()),
        date: submitted - Duration::days(1),
        duration_minutes: 60,
        cpt_code: "92523".into(),
        modifiers: Vec::new(),
        units: 1,
        rate: Decimal::from(amount),
        amount: Decimal::from(amount),
    };
    let mut claim = Claim::draft(PATIENT, vec![line], None, submitted).unwrap();
    claim.status = ClaimStatus::Submitted;
    claim.claim_number = Some("CLM-20240101-000001".into());
    claim.date_submitted = Some(submitted);
    claim
}

async fn open_sqlite(dir: &TempDir) -> Arc<SqliteBillingRepository> {
    let path = dir.path().join("aac_billing.db");
    Arc::new(SqliteBillingRepository::connect(path.to_str().unwrap(), 4).await.unwrap())
}

#[tokio::test]
async fn test_sqlite_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(InMemorySessionSource::new());
    let ids = session(&sessions, "s-1", Utc::now() - Duration::days(2));

    let claim_id = {
        let service = service_with(open_sqlite(&dir).await, sessions.clone(), EventBus::default());
        service.upsert_profile(profile(PATIENT, "Aetna")).await.unwrap();
        let claim = service
            .create_claim(PATIENT, &ids, CreateClaimOptions { submit_immediately: true })
            .await
            .unwrap();
        service
            .process_payment(
                claim.id,
                PaymentDetails {
                    amount: Decimal::from(110),
                    allowed_amount: Decimal::from(125),
                    patient_responsibility: Decimal::from(15),
                    check_number: None,
                    payment_date: Utc::now(),
                },
            )
            .await
            .unwrap();
        claim.id
    };

    let service = service_with(open_sqlite(&dir).await, sessions, EventBus::default());
    let claim = service.get_claim(claim_id).await.unwrap().unwrap();
    assert_eq!(claim.status, ClaimStatus::Paid);
    assert!(claim.claim_number.is_some());

    let profile = service.get_profile(PATIENT).await.unwrap().unwrap();
    assert_eq!(profile.balance, Decimal::from(15));
    assert_eq!(profile.authorizations[0].used_units, 1);
}

#[tokio::test]
async fn test_aging_report_for_claim_submitted_45_days_ago() {
    let dir = TempDir::new().unwrap();
    let repository = open_sqlite(&dir).await;
    repository
        .commit(ChangeSet::new().with_claim(submitted_claim(200, 45)))
        .await
        .unwrap();
    let service = service_with(repository, Arc::new(InMemorySessionSource::new()), EventBus::default());

    let now = Utc::now();
    let report = service.generate_billing_report(now - Duration::days(120), now).await.unwrap();

    assert_eq!(report.aging.days30, Decimal::from(200));
    assert_eq!(report.aging.current, Decimal::ZERO);
    assert_eq!(report.aging.days60, Decimal::ZERO);
    assert_eq!(report.aging.days90, Decimal::ZERO);
    assert_eq!(report.aging.over90, Decimal::ZERO);
    assert_eq!(report.summary.total_pending, Decimal::from(200));
    assert_eq!(report.insurer_stats[0].insurer, "Unknown");
}

#[tokio::test]
async fn test_report_totals_only_cover_window() {
    let repository = Arc::new(InMemoryBillingRepository::new());
    repository
        .commit(
            ChangeSet::new()
                .with_profile(profile(PATIENT, "Cigna"))
                .with_claim(submitted_claim(100, 10))
                .with_claim(submitted_claim(250, 20))
                .with_claim(submitted_claim(999, 200)),
        )
        .await
        .unwrap();
    let service = service_with(repository, Arc::new(InMemorySessionSource::new()), EventBus::default());

    let now = Utc::now();
    let report = service.generate_billing_report(now - Duration::days(60), now).await.unwrap();

    assert_eq!(report.summary.total_claims, 2);
    assert_eq!(report.summary.total_billed, Decimal::from(350));
    assert_eq!(report.insurer_stats.len(), 1);
    assert_eq!(report.insurer_stats[0].insurer, "Cigna");
    assert_eq!(report.patient_stats[0].sessions_billed, 2);

    let inverted = service.generate_billing_report(now, now - Duration::days(1)).await;
    assert!(matches!(inverted, Err(BillingError::Validation(_))));
}

#[tokio::test]
async fn test_json_backup_restores_into_fresh_store() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(InMemorySessionSource::new());
    let source = service_with(open_sqlite(&dir).await, sessions.clone(), EventBus::default());
    source.upsert_profile(profile(PATIENT, "Aetna")).await.unwrap();
    source.upsert_profile(profile("patient-0200", "Kaiser")).await.unwrap();
    let ids = session(&sessions, "s-9", Utc::now() - Duration::days(3));
    let claim = source.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await.unwrap();
    source.submit_claim(claim.id).await.unwrap();

    let backup = source.export_billing_data(ExportFormat::Json).await.unwrap();

    let restored_repo = Arc::new(InMemoryBillingRepository::new());
    let restored = service_with(restored_repo.clone(), sessions, EventBus::default());
    let summary = restored.import_billing_data(&backup).await.unwrap();
    assert_eq!(summary, ImportSummary { profiles: 2, claims: 1 });

    assert_eq!(
        restored.get_claim(claim.id).await.unwrap(),
        source.get_claim(claim.id).await.unwrap()
    );
    assert_eq!(restored.get_profile(PATIENT).await.unwrap(), source.get_profile(PATIENT).await.unwrap());
    assert_eq!(restored.export_billing_data(ExportFormat::Json).await.unwrap(), backup);
}

#[tokio::test]
async fn test_import_cannot_rewrite_paid_claim() {
    let repository = Arc::new(InMemoryBillingRepository::new());
    let mut paid = submitted_claim(150, 30);
    paid.status = ClaimStatus::Paid;
    paid.paid_amount = Some(Decimal::from(150));
    repository.commit(ChangeSet::new().with_claim(paid.clone())).await.unwrap();
    let service = service_with(repository, Arc::new(InMemorySessionSource::new()), EventBus::default());

    let mut tampered = paid.clone();
    tampered.paid_amount = Some(Decimal::from(1));
    let backup = serde_json::json!({
        "billingProfiles": [],
        "billingClaims": [[tampered.id, tampered]],
    })
    .to_string();

    let result = service.import_billing_data(&backup).await;
    assert!(matches!(result, Err(BillingError::ClaimImmutable(_))));
    assert_eq!(service.get_claim(paid.id).await.unwrap(), Some(paid));
}

#[tokio::test]
async fn test_csv_export_summarizes_claims() {
    let repository = Arc::new(InMemoryBillingRepository::new());
    let claim = submitted_claim(200, 5);
    repository.commit(ChangeSet::new().with_claim(claim.clone())).await.unwrap();
    let service = service_with(repository, Arc::new(InMemorySessionSource::new()), EventBus::default());

    let csv = service.export_billing_data(ExportFormat::Csv).await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Claim ID,Patient ID,Date,Amount,Status,Paid Amount");
    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields[0], claim.id.to_string());
    assert_eq!(fields[1], PATIENT);
    assert_eq!(fields[3], "200.00");
    assert_eq!(fields[4], "submitted");
    assert_eq!(fields[5], "0.00");
}

#[tokio::test]
async fn test_audit_trail_follows_claim_workflow() {
    let bus = EventBus::new(64);
    let audit = AuditEngine::new();
    let listener = audit.attach(&bus).unwrap();

    let sessions = Arc::new(InMemorySessionSource::new());
    let service = service_with(Arc::new(InMemoryBillingRepository::new()), sessions.clone(), bus);
    service.upsert_profile(profile(PATIENT, "Aetna")).await.unwrap();
    let ids = session(&sessions, "s-audit", Utc::now() - Duration::days(1));
    let claim = service.create_claim(PATIENT, &ids, CreateClaimOptions::default()).await.unwrap();
    service.submit_claim(claim.id).await.unwrap();

    // profile.upserted, claim.created, claim.submitted
    for _ in 0..100 {
        if audit.trail().len() >= 3 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let entries = audit.trail().by_subject(PATIENT);
    let actions: Vec<&str> = entries.iter().map(|entry| entry.action.as_str()).collect();
    assert_eq!(actions, vec!["profile.upserted", "claim.created", "claim.submitted"]);
    assert!(audit.trail().verify_integrity().is_ok());

    drop(service);
    listener.abort();
}
