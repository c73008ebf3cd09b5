use rust_decimal::Decimal;
use serde::Serialize;

use super::ClaimService;
use crate::audit::AuditCategory;
use crate::auth::{Action, RequestContext, Role};
use crate::domain::claim::{Claim, ClaimId, ClaimStatus, PaymentStatus};
use crate::domain::document::{Document, DocumentId};
use crate::domain::profile::Lecturer;
use crate::errors::WorkflowError;
use crate::ports::{ClaimFilter, ClaimOrder};
use crate::storage::StorageError;

const EVENT_READ: &str = "claim.read";
const RECENTLY_PAID_LIMIT: u32 = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClaimDetails {
    pub claim: Claim,
    pub total_amount: Decimal,
    pub lecturer: Option<Lecturer>,
    pub documents: Vec<Document>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaymentQueue {
    pub awaiting_payment: Vec<Claim>,
    pub recently_paid: Vec<Claim>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentDownload {
    pub document: Document,
    pub bytes: Vec<u8>,
}

impl ClaimService {
    /// Single-claim read. An absent id is `NotFound` for everyone; an existing claim owned by
    /// another lecturer is `Forbidden`.
    pub async fn get_claim(
        &self,
        ctx: &RequestContext,
        claim_id: &ClaimId,
    ) -> Result<ClaimDetails, WorkflowError> {
        let attempt = async {
            let claim = self.load_claim(claim_id).await?;
            self.authorize_read(ctx, &claim).await?;

            let lecturer = self.profiles.find_lecturer(&claim.lecturer_id).await?;
            let documents = self.documents.list_documents_for_claim(&claim.id).await?;
            let total_amount = claim.total_amount();
            Ok::<_, WorkflowError>(ClaimDetails { claim, total_amount, lecturer, documents })
        };

        attempt.await.map_err(|error| {
            self.refuse(ctx, Some(claim_id), EVENT_READ, AuditCategory::Access, error)
        })
    }

    /// The calling lecturer's claims, newest first.
    pub async fn my_claims(&self, ctx: &RequestContext) -> Result<Vec<Claim>, WorkflowError> {
        ctx.subject.authorize(Action::ListOwnClaims)?;
        let lecturer = self.active_lecturer(ctx).await?;

        let claims = self
            .claims
            .list_claims(&ClaimFilter {
                lecturer_id: Some(lecturer.id),
                order: ClaimOrder::NewestFirst,
                ..ClaimFilter::default()
            })
            .await?;
        Ok(claims)
    }

    /// Claims awaiting first-tier review, oldest first. Returned claims come back here.
    pub async fn coordinator_queue(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Claim>, WorkflowError> {
        ctx.subject.authorize(Action::ViewCoordinatorQueue)?;

        let claims = self
            .claims
            .list_claims(&ClaimFilter {
                statuses: vec![ClaimStatus::Pending, ClaimStatus::ReturnedToCoordinator],
                order: ClaimOrder::OldestFirst,
                ..ClaimFilter::default()
            })
            .await?;
        Ok(claims)
    }

    /// Coordinator-approved claims in the order the coordinator approved them.
    pub async fn manager_queue(&self, ctx: &RequestContext) -> Result<Vec<Claim>, WorkflowError> {
        ctx.subject.authorize(Action::ViewManagerQueue)?;

        let claims = self
            .claims
            .list_claims(&ClaimFilter {
                statuses: vec![ClaimStatus::ApprovedByCoordinator],
                order: ClaimOrder::CoordinatorApprovalAsc,
                ..ClaimFilter::default()
            })
            .await?;
        Ok(claims)
    }

    pub async fn payment_queue(&self, ctx: &RequestContext) -> Result<PaymentQueue, WorkflowError> {
        ctx.subject.authorize(Action::ViewPaymentQueue)?;

        let approved = self
            .claims
            .list_claims(&ClaimFilter {
                statuses: vec![ClaimStatus::FullyApproved],
                order: ClaimOrder::ManagerApprovalDesc,
                ..ClaimFilter::default()
            })
            .await?;
        let awaiting_payment = approved
            .into_iter()
            .filter(|claim| claim.payment_status != PaymentStatus::Paid)
            .collect();

        let recently_paid = self
            .claims
            .list_claims(&ClaimFilter {
                payment_status: Some(PaymentStatus::Paid),
                order: ClaimOrder::PaymentDesc,
                limit: Some(RECENTLY_PAID_LIMIT),
                ..ClaimFilter::default()
            })
            .await?;

        Ok(PaymentQueue { awaiting_payment, recently_paid })
    }

    /// Returns a stored document's bytes to anyone who may read its claim.
    pub async fn download_document(
        &self,
        ctx: &RequestContext,
        document_id: &DocumentId,
    ) -> Result<DocumentDownload, WorkflowError> {
        let document = self
            .documents
            .find_document(document_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("document", document_id.0.clone()))?;
        let claim = self.load_claim(&document.claim_id).await?;
        self.authorize_read(ctx, &claim).await.map_err(|error| {
            self.refuse(ctx, Some(&claim.id), EVENT_READ, AuditCategory::Access, error)
        })?;

        let bytes = match self.storage.read(&document.storage_path).await {
            Ok(bytes) => bytes,
            Err(StorageError::Missing(_)) => {
                tracing::warn!(
                    event_name = "document.bytes_missing",
                    correlation_id = %ctx.correlation_id,
                    claim_id = %claim.id,
                    document_id = %document.id.0,
                    "document record has no stored bytes"
                );
                return Err(WorkflowError::not_found("document", document_id.0.clone()));
            }
            Err(error) => {
                let error = WorkflowError::dependency("storage", error.to_string());
                return Err(self.refuse(
                    ctx,
                    Some(&claim.id),
                    "document.read",
                    AuditCategory::Access,
                    error,
                ));
            }
        };

        Ok(DocumentDownload { document, bytes })
    }

    /// Reviewing and administrative roles read every claim; a lecturer reads only their own.
    pub(crate) async fn authorize_read(
        &self,
        ctx: &RequestContext,
        claim: &Claim,
    ) -> Result<(), WorkflowError> {
        if ctx.subject.roles.iter().any(Role::reads_all_claims) {
            return Ok(());
        }

        let forbidden = || WorkflowError::Forbidden {
            user_id: ctx.user_id().0.clone(),
            claim_id: claim.id.0.clone(),
        };
        if !ctx.subject.has_role(Role::Lecturer) {
            return Err(forbidden());
        }

        match self.profiles.find_lecturer_by_user(ctx.user_id()).await? {
            Some(lecturer) if lecturer.id == claim.lecturer_id => Ok(()),
            _ => Err(forbidden()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::attachments::Upload;
    use crate::auth::Role;
    use crate::domain::claim::{ClaimId, ClaimStatus};
    use crate::errors::ErrorKind;
    use crate::lifecycle::{CoordinatorVerdict, ManagerVerdict};
    use crate::service::testing::{coordinator, ctx, harness, lecturer, manager, Harness};
    use crate::service::ClaimSubmission;

    async fn submit(h: &Harness, user: &str, day: u32, uploads: Vec<Upload>) -> ClaimId {
        h.service
            .submit_claim(
                &ctx(user, Role::Lecturer),
                ClaimSubmission {
                    claim_date: NaiveDate::from_ymd_opt(2026, 4, day).expect("valid date"),
                    hours_worked: Decimal::from(5),
                    description: format!("Lectures on day {day}"),
                    department: None,
                    uploads,
                },
            )
            .await
            .expect("submitted")
            .claim
            .id
    }

    #[tokio::test]
    async fn missing_claim_is_not_found_for_every_role() {
        let h = harness();

        for role in [Role::Lecturer, Role::Coordinator, Role::Hr] {
            let error = h
                .service
                .get_claim(&ctx("someone", role), &ClaimId("999".to_string()))
                .await
                .expect_err("claim 999 does not exist");
            assert_eq!(error.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn lecturer_cannot_read_another_lecturers_claim() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 200).await;
        lecturer(&h.fakes, "lec-b", 200).await;
        let claim_b = submit(&h, "lec-b", 3, Vec::new()).await;

        let error = h
            .service
            .get_claim(&ctx("lec-a", Role::Lecturer), &claim_b)
            .await
            .expect_err("lecturer A is not the owner");
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        let own = h.service.get_claim(&ctx("lec-b", Role::Lecturer), &claim_b).await.expect("own");
        assert_eq!(own.total_amount, Decimal::from(1_000));
        assert_eq!(own.lecturer.map(|l| l.user_id.0), Some("lec-b".to_string()));
    }

    #[tokio::test]
    async fn reviewers_read_any_claim() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 200).await;
        let claim = submit(&h, "lec-a", 3, Vec::new()).await;

        for role in [Role::Coordinator, Role::Manager, Role::Hr, Role::Admin] {
            h.service.get_claim(&ctx("staff", role), &claim).await.expect("staff may read");
        }
    }

    #[tokio::test]
    async fn queues_follow_review_order() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 200).await;
        coordinator(&h.fakes, "pc-1").await;
        manager(&h.fakes, "am-1").await;
        let first = submit(&h, "lec-a", 1, Vec::new()).await;
        let second = submit(&h, "lec-a", 2, Vec::new()).await;
        let pc = ctx("pc-1", Role::Coordinator);

        let queue = h.service.coordinator_queue(&pc).await.expect("queue");
        let ids: Vec<ClaimId> = queue.iter().map(|claim| claim.id.clone()).collect();
        assert_eq!(ids, vec![first.clone(), second.clone()]);

        h.service
            .coordinator_review(&pc, &second, CoordinatorVerdict::Approve, None)
            .await
            .expect("approve second");
        h.service
            .coordinator_review(&pc, &first, CoordinatorVerdict::Approve, None)
            .await
            .expect("approve first");

        let am = ctx("am-1", Role::Manager);
        let queue = h.service.manager_queue(&am).await.expect("manager queue");
        assert_eq!(queue[0].id, second);
        assert!(h.service.coordinator_queue(&pc).await.expect("queue").is_empty());

        h.service
            .manager_review(&am, &second, ManagerVerdict::Return, Some("Split by week".to_string()))
            .await
            .expect("return");
        let queue = h.service.coordinator_queue(&pc).await.expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].status, ClaimStatus::ReturnedToCoordinator);
    }

    #[tokio::test]
    async fn my_claims_lists_only_own_newest_first() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 200).await;
        lecturer(&h.fakes, "lec-b", 200).await;
        let older = submit(&h, "lec-a", 1, Vec::new()).await;
        let newer = submit(&h, "lec-a", 2, Vec::new()).await;
        submit(&h, "lec-b", 3, Vec::new()).await;

        let mine = h.service.my_claims(&ctx("lec-a", Role::Lecturer)).await.expect("mine");
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().any(|claim| claim.id == older));
        assert!(mine.iter().any(|claim| claim.id == newer));
        assert!(mine[0].created_at >= mine[1].created_at);

        let error = h.service.my_claims(&ctx("hr-1", Role::Hr)).await.expect_err("not a lecturer");
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn payment_queue_separates_awaiting_and_paid() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 200).await;
        coordinator(&h.fakes, "pc-1").await;
        manager(&h.fakes, "am-1").await;
        let pc = ctx("pc-1", Role::Coordinator);
        let am = ctx("am-1", Role::Manager);
        let hr = ctx("hr-1", Role::Hr);

        let mut ids = Vec::new();
        for day in 1..=2 {
            let id = submit(&h, "lec-a", day, Vec::new()).await;
            h.service
                .coordinator_review(&pc, &id, CoordinatorVerdict::Approve, None)
                .await
                .expect("coordinator approves");
            h.service
                .manager_review(&am, &id, ManagerVerdict::Approve, None)
                .await
                .expect("manager approves");
            ids.push(id);
        }
        h.service.mark_processing(&hr, &ids[0]).await.expect("processing");
        h.service.mark_paid(&hr, &ids[0]).await.expect("paid");

        let queue = h.service.payment_queue(&hr).await.expect("queue");
        assert_eq!(queue.awaiting_payment.len(), 1);
        assert_eq!(queue.awaiting_payment[0].id, ids[1]);
        assert_eq!(queue.recently_paid.len(), 1);
        assert_eq!(queue.recently_paid[0].id, ids[0]);
    }

    #[tokio::test]
    async fn document_download_applies_read_gate_and_detects_missing_bytes() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 200).await;
        lecturer(&h.fakes, "lec-b", 200).await;
        let claim = submit(
            &h,
            "lec-a",
            5,
            vec![Upload::new("timesheet.csv", "text/csv", b"week,hours\n1,5\n".to_vec())],
        )
        .await;
        let details =
            h.service.get_claim(&ctx("lec-a", Role::Lecturer), &claim).await.expect("owner reads");
        let document = details.documents[0].clone();

        let download = h
            .service
            .download_document(&ctx("lec-a", Role::Lecturer), &document.id)
            .await
            .expect("owner downloads");
        assert_eq!(download.bytes, b"week,hours\n1,5\n".to_vec());

        let forbidden = h
            .service
            .download_document(&ctx("lec-b", Role::Lecturer), &document.id)
            .await
            .expect_err("not the owner");
        assert_eq!(forbidden.kind(), ErrorKind::Forbidden);

        assert!(h.storage.remove(&document.storage_path).await);
        let missing = h
            .service
            .download_document(&ctx("pc-1", Role::Coordinator), &document.id)
            .await
            .expect_err("bytes are gone");
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }
}
