use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use claimdesk_core::attachments::Upload;
use claimdesk_core::audit::InMemoryAuditSink;
use claimdesk_core::auth::{RequestContext, Role, Subject};
use claimdesk_core::domain::claim::{ClaimStatus, PaymentStatus};
use claimdesk_core::errors::ErrorKind;
use claimdesk_core::lifecycle::{CoordinatorVerdict, ManagerVerdict};
use claimdesk_core::reports::TemplateReportGenerator;
use claimdesk_core::service::{ClaimService, ClaimSubmission, Stores};
use claimdesk_core::storage::InMemoryStorageSink;
use claimdesk_db::{
    connect_with_settings, in_memory_stores, migrations, sql_stores, DemoSeedDataset,
};

fn ctx(user: &str, role: Role) -> RequestContext {
    RequestContext::new(Subject::new(user, [role]))
}

fn service(stores: Stores) -> (ClaimService, InMemoryAuditSink) {
    let audit = InMemoryAuditSink::default();
    let service = ClaimService::new(
        stores,
        Arc::new(InMemoryStorageSink::default()),
        Arc::new(TemplateReportGenerator::new().expect("templates load")),
        Arc::new(audit.clone()),
    );
    (service, audit)
}

async fn seeded_sql_service() -> (ClaimService, InMemoryAuditSink) {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    DemoSeedDataset::load(&pool).await.expect("seed");
    service(sql_stores(pool))
}

fn submission(day: u32, hours: i64) -> ClaimSubmission {
    ClaimSubmission {
        claim_date: NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date"),
        hours_worked: Decimal::from(hours),
        description: format!("Lectures and tutorials, week of the {day}th"),
        department: None,
        uploads: Vec::new(),
    }
}

#[tokio::test]
async fn sqlite_claim_runs_from_submission_to_payment() {
    let (service, audit) = seeded_sql_service().await;
    let lecturer = ctx("lecturer-1", Role::Lecturer);

    let mut first = submission(2, 12);
    first.uploads = vec![Upload::new("timesheet.pdf", "application/pdf", b"%PDF-1.7".to_vec())];
    let receipt = service.submit_claim(&lecturer, first).await.expect("submit");
    assert_eq!(receipt.claim.hourly_rate, Decimal::new(25_000, 2));
    assert_eq!(receipt.total_amount, Decimal::from(3_000));
    assert_eq!(receipt.claim.department, "Computer Science");
    assert_eq!(receipt.attachments.attached.len(), 1);

    let id = receipt.claim.id.clone();
    service
        .coordinator_review(
            &ctx("coordinator-1", Role::Coordinator),
            &id,
            CoordinatorVerdict::Approve,
            None,
        )
        .await
        .expect("coordinator approves");
    let approved = service
        .manager_review(
            &ctx("manager-1", Role::Manager),
            &id,
            ManagerVerdict::Approve,
            Some("Rates confirmed".to_string()),
        )
        .await
        .expect("manager approves");
    assert_eq!(approved.claim.status, ClaimStatus::FullyApproved);
    assert_eq!(approved.claim.version, 2);

    let hr = ctx("hr-1", Role::Hr);
    service.mark_processing(&hr, &id).await.expect("processing");
    let paid = service.mark_paid(&hr, &id).await.expect("paid");
    assert_eq!(paid.claim.payment_status, PaymentStatus::Paid);

    let details = service.get_claim(&lecturer, &id).await.expect("owner reads");
    assert_eq!(details.claim.payment_status, PaymentStatus::Paid);
    assert_eq!(details.documents.len(), 1);
    assert_eq!(details.claim.manager_notes.as_deref(), Some("Rates confirmed"));
    assert_eq!(
        details.claim.manager_approval.map(|stamp| stamp.actor_id.0),
        Some("AM-0001".to_string())
    );

    let queue = service.payment_queue(&hr).await.expect("payment queue");
    assert!(queue.awaiting_payment.is_empty());
    assert_eq!(queue.recently_paid.len(), 1);

    assert!(audit.events().len() >= 5);
}

#[tokio::test]
async fn sqlite_enforces_monthly_cap_and_ignores_rejected_claims() {
    let (service, _) = seeded_sql_service().await;
    let lecturer = ctx("lecturer-1", Role::Lecturer);

    service.submit_claim(&lecturer, submission(3, 175)).await.expect("175 hours");
    let over = service
        .submit_claim(&lecturer, submission(20, 130))
        .await
        .expect_err("305 hours is over the ceiling");
    assert_eq!(over.kind(), ErrorKind::ValidationFailed);
    assert!(over.to_string().contains("305"));

    let exact = service.submit_claim(&lecturer, submission(21, 125)).await.expect("exactly 300");
    service
        .coordinator_review(
            &ctx("coordinator-1", Role::Coordinator),
            &exact.claim.id,
            CoordinatorVerdict::Reject,
            Some("Duplicate of another claim".to_string()),
        )
        .await
        .expect("reject");

    service.submit_claim(&lecturer, submission(22, 100)).await.expect("allowance restored");

    let april = ClaimSubmission {
        claim_date: NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid date"),
        ..submission(1, 200)
    };
    service.submit_claim(&lecturer, april).await.expect("new month");
}

#[tokio::test]
async fn sqlite_store_detects_concurrent_reviews() {
    let (service, _) = seeded_sql_service().await;
    let receipt = service
        .submit_claim(&ctx("lecturer-1", Role::Lecturer), submission(4, 8))
        .await
        .expect("submit");
    let coordinator = ctx("coordinator-1", Role::Coordinator);
    let id = &receipt.claim.id;

    let (left, right) = tokio::join!(
        service.coordinator_review(&coordinator, id, CoordinatorVerdict::Approve, None),
        service.coordinator_review(&coordinator, id, CoordinatorVerdict::Reject, None),
    );

    let successes = [left.is_ok(), right.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one reviewer wins");
    let loser = left.err().or(right.err()).expect("one reviewer loses");
    assert!(matches!(loser.kind(), ErrorKind::Conflict | ErrorKind::InvalidTransition));
}

#[tokio::test]
async fn sqlite_read_gate_matches_in_memory_behaviour() {
    let (sql_service, _) = seeded_sql_service().await;
    let receipt = sql_service
        .submit_claim(&ctx("lecturer-1", Role::Lecturer), submission(5, 3))
        .await
        .expect("submit");

    let other = sql_service
        .get_claim(&ctx("lecturer-2", Role::Lecturer), &receipt.claim.id)
        .await
        .expect_err("another lecturer's claim");
    assert_eq!(other.kind(), ErrorKind::Forbidden);

    let (memory_service, _) = service(in_memory_stores());
    let missing = memory_service
        .get_claim(&ctx("lecturer-1", Role::Lecturer), &receipt.claim.id)
        .await
        .expect_err("nothing stored in memory");
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}
