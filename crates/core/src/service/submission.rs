use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{ClaimService, WorkflowPolicy};
use crate::attachments::{AttachmentReport, Upload};
use crate::audit::{AuditCategory, AuditOutcome};
use crate::auth::{Action, RequestContext};
use crate::domain::claim::{Claim, ClaimId, PaymentStatus};
use crate::domain::profile::Lecturer;
use crate::errors::{ValidationFailure, WorkflowError};
use crate::hours_cap::{HoursCapCheck, MonthWindow};

const EVENT_SUBMITTED: &str = "claim.submitted";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimSubmission {
    pub claim_date: NaiveDate,
    pub hours_worked: Decimal,
    pub description: String,
    /// Falls back to the lecturer's department when absent or blank.
    pub department: Option<String>,
    pub uploads: Vec<Upload>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub claim: Claim,
    pub total_amount: Decimal,
    pub hours_cap: HoursCapCheck,
    pub attachments: AttachmentReport,
}

impl ClaimService {
    /// Creates a `Pending` claim for the calling lecturer at their current profile rate.
    ///
    /// Nothing is written when any check fails. Uploads are attached after the claim exists and
    /// never fail the submission; skipped files are listed on the receipt.
    pub async fn submit_claim(
        &self,
        ctx: &RequestContext,
        submission: ClaimSubmission,
    ) -> Result<SubmissionReceipt, WorkflowError> {
        self.try_submit(ctx, submission).await.map_err(|error| {
            self.refuse(ctx, None, EVENT_SUBMITTED, AuditCategory::Submission, error)
        })
    }

    async fn try_submit(
        &self,
        ctx: &RequestContext,
        submission: ClaimSubmission,
    ) -> Result<SubmissionReceipt, WorkflowError> {
        ctx.subject.authorize(Action::SubmitClaim)?;
        let lecturer = self.active_lecturer(ctx).await?;
        let description = validate_submission(&self.policy, &lecturer, &submission)?;

        let window = MonthWindow::containing(submission.claim_date);
        let month_claims = self
            .claims
            .find_claims_by_lecturer_and_period(&lecturer.id, window.start, window.end)
            .await?;
        let hours_cap = self.hours_cap.check(
            &lecturer.id,
            submission.claim_date,
            submission.hours_worked,
            &month_claims,
        )?;

        let department = submission
            .department
            .as_deref()
            .map(str::trim)
            .filter(|department| !department.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| lecturer.department.clone());

        let now = Utc::now();
        let claim = self
            .claims
            .insert_claim(Claim {
                id: ClaimId::generate(),
                lecturer_id: lecturer.id.clone(),
                claim_date: submission.claim_date,
                hours_worked: submission.hours_worked,
                hourly_rate: lecturer.hourly_rate,
                description,
                department,
                status: self.lifecycle.initial_state(),
                coordinator_approval: None,
                coordinator_notes: None,
                manager_approval: None,
                manager_notes: None,
                payment_status: PaymentStatus::Unpaid,
                payment: None,
                version: 0,
                created_at: now,
            })
            .await?;

        let attachments = self.attachments.attach(&claim.id, &submission.uploads, now).await;
        for skipped in &attachments.skipped {
            tracing::warn!(
                event_name = "attachment.skipped",
                correlation_id = %ctx.correlation_id,
                claim_id = %claim.id,
                file_name = %skipped.file_name,
                reason = ?skipped.reason,
                "upload was not attached"
            );
        }

        let total_amount = claim.total_amount();
        tracing::info!(
            event_name = EVENT_SUBMITTED,
            correlation_id = %ctx.correlation_id,
            claim_id = %claim.id,
            lecturer_id = %lecturer.id.0,
            hours = %claim.hours_worked,
            month_total = %hours_cap.projected_total,
            documents = attachments.attached.len(),
            "claim submitted"
        );
        self.record(
            ctx,
            Some(&claim.id),
            EVENT_SUBMITTED,
            AuditCategory::Submission,
            AuditOutcome::Success,
            &[
                ("hours_worked", claim.hours_worked.to_string()),
                ("total_amount", total_amount.to_string()),
                ("documents_attached", attachments.attached.len().to_string()),
                ("documents_skipped", attachments.skipped.len().to_string()),
            ],
        );

        Ok(SubmissionReceipt { claim, total_amount, hours_cap, attachments })
    }
}

/// Checks the per-claim limits and returns the trimmed description.
fn validate_submission(
    policy: &WorkflowPolicy,
    lecturer: &Lecturer,
    submission: &ClaimSubmission,
) -> Result<String, ValidationFailure> {
    let hours = submission.hours_worked;
    if hours <= Decimal::ZERO || hours > policy.max_hours_per_claim {
        return Err(ValidationFailure::HoursOutOfRange { hours, max: policy.max_hours_per_claim });
    }

    let description = submission.description.trim();
    if description.is_empty() {
        return Err(ValidationFailure::DescriptionMissing);
    }
    let len = description.chars().count();
    if len > policy.max_description_len {
        return Err(ValidationFailure::DescriptionTooLong { len, max: policy.max_description_len });
    }

    let rate = lecturer.hourly_rate;
    if rate < Decimal::ZERO || rate > policy.max_hourly_rate {
        return Err(ValidationFailure::RateOutOfRange { rate, max: policy.max_hourly_rate });
    }

    Ok(description.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::ClaimSubmission;
    use crate::attachments::{SkipReason, Upload};
    use crate::audit::AuditOutcome;
    use crate::auth::Role;
    use crate::config::AppConfig;
    use crate::domain::claim::{ClaimStatus, PaymentStatus};
    use crate::errors::{ErrorKind, ValidationFailure, WorkflowError};
    use crate::ports::{ClaimFilter, ClaimStore, DocumentStore, ProfileStore};
    use crate::service::testing::{ctx, harness, lecturer};

    fn submission(day: u32, hours: i64) -> ClaimSubmission {
        ClaimSubmission {
            claim_date: NaiveDate::from_ymd_opt(2026, 10, day).expect("valid date"),
            hours_worked: Decimal::from(hours),
            description: "  Second-year tutorials  ".to_string(),
            department: None,
            uploads: Vec::new(),
        }
    }

    #[tokio::test]
    async fn submission_copies_profile_rate_and_starts_pending() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 250).await;

        let receipt = h
            .service
            .submit_claim(&ctx("lec-a", Role::Lecturer), submission(3, 12))
            .await
            .expect("submitted");

        assert_eq!(receipt.claim.status, ClaimStatus::Pending);
        assert_eq!(receipt.claim.payment_status, PaymentStatus::Unpaid);
        assert_eq!(receipt.claim.hourly_rate, Decimal::from(250));
        assert_eq!(receipt.total_amount, Decimal::from(3_000));
        assert_eq!(receipt.claim.description, "Second-year tutorials");
        assert_eq!(receipt.claim.department, "Computer Science");
        assert_eq!(h.audit.events().len(), 1);
    }

    #[tokio::test]
    async fn cap_overflow_reports_would_be_total_and_stores_nothing() {
        let h = harness();
        let mut config = AppConfig::default();
        config.workflow.monthly_hours_cap = 180;
        config.workflow.max_hours_per_claim = 180;
        let service = h.service.clone().configured(&config);
        lecturer(&h.fakes, "lec-a", 250).await;
        let ctx = ctx("lec-a", Role::Lecturer);

        service.submit_claim(&ctx, submission(1, 175)).await.expect("175 fits");
        let error = service
            .submit_claim(&ctx, submission(20, 10))
            .await
            .expect_err("185 exceeds 180");

        assert_eq!(error.kind(), ErrorKind::ValidationFailed);
        assert!(error.to_string().contains("(185)"));
        assert!(error.to_string().contains("exceeds the maximum of 180 hours"));
        assert!(error.to_string().contains("You have 5 hours remaining"));
        let stored = h.fakes.list_claims(&ClaimFilter::default()).await.expect("list");
        assert_eq!(stored.len(), 1);
        let last = h.audit.events().pop().expect("refusal audited");
        assert_eq!(last.outcome, AuditOutcome::Rejected);
    }

    #[tokio::test]
    async fn rejected_claims_free_up_monthly_allowance() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 100).await;
        let ctx = ctx("lec-a", Role::Lecturer);

        let first = h.service.submit_claim(&ctx, submission(2, 290)).await.expect("290 fits");
        let mut rejected = first.claim.clone();
        rejected.status = ClaimStatus::Rejected;
        h.fakes.update_claim(rejected).await.expect("reject in store");

        h.service.submit_claim(&ctx, submission(9, 300)).await.expect("rejected hours ignored");
    }

    #[tokio::test]
    async fn per_claim_limits_are_validation_failures() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 250).await;
        let ctx = ctx("lec-a", Role::Lecturer);

        let zero = h.service.submit_claim(&ctx, submission(3, 0)).await.expect_err("zero hours");
        assert!(matches!(
            zero,
            WorkflowError::ValidationFailed(ValidationFailure::HoursOutOfRange { .. })
        ));

        let mut blank = submission(3, 4);
        blank.description = "   ".to_string();
        let blank = h.service.submit_claim(&ctx, blank).await.expect_err("blank description");
        assert_eq!(blank, WorkflowError::ValidationFailed(ValidationFailure::DescriptionMissing));

        let mut long = submission(3, 4);
        long.description = "x".repeat(501);
        let long = h.service.submit_claim(&ctx, long).await.expect_err("too long");
        assert!(matches!(
            long,
            WorkflowError::ValidationFailed(ValidationFailure::DescriptionTooLong {
                len: 501,
                max: 500
            })
        ));
    }

    #[tokio::test]
    async fn rate_above_ceiling_is_refused() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 800).await;

        let error = h
            .service
            .submit_claim(&ctx("lec-a", Role::Lecturer), submission(3, 4))
            .await
            .expect_err("rate 800 > 500");
        assert!(matches!(
            error,
            WorkflowError::ValidationFailed(ValidationFailure::RateOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn non_lecturers_and_missing_profiles_are_distinct_failures() {
        let h = harness();

        let unauthorized = h
            .service
            .submit_claim(&ctx("pc-1", Role::Coordinator), submission(3, 4))
            .await
            .expect_err("coordinators cannot submit");
        assert_eq!(unauthorized.kind(), ErrorKind::Unauthorized);

        let no_profile = h
            .service
            .submit_claim(&ctx("lec-ghost", Role::Lecturer), submission(3, 4))
            .await
            .expect_err("no lecturer profile");
        assert_eq!(no_profile.kind(), ErrorKind::ProfileNotFound);
    }

    #[tokio::test]
    async fn inactive_lecturer_cannot_submit() {
        let h = harness();
        let mut profile = lecturer(&h.fakes, "lec-a", 250).await;
        profile.active = false;
        h.fakes.save_lecturer(profile).await.expect("deactivate");

        let error = h
            .service
            .submit_claim(&ctx("lec-a", Role::Lecturer), submission(3, 4))
            .await
            .expect_err("inactive profile");
        assert_eq!(error.kind(), ErrorKind::ProfileNotFound);
    }

    #[tokio::test]
    async fn uploads_attach_and_oversized_files_are_skipped() {
        let h = harness();
        let mut config = AppConfig::default();
        config.storage.max_document_bytes = 16;
        let service = h.service.clone().configured(&config);
        lecturer(&h.fakes, "lec-a", 250).await;

        let mut request = submission(3, 4);
        request.department = Some("Mathematics".to_string());
        request.uploads = vec![
            Upload::new("timesheet.pdf", "application/pdf", b"%PDF-1.7".to_vec()),
            Upload::new("scan.png", "image/png", vec![1_u8; 17]),
        ];

        let receipt =
            service.submit_claim(&ctx("lec-a", Role::Lecturer), request).await.expect("submitted");

        assert_eq!(receipt.claim.department, "Mathematics");
        assert_eq!(receipt.attachments.attached.len(), 1);
        assert_eq!(receipt.attachments.skipped.len(), 1);
        assert_eq!(h.storage.len().await, 1);
        let documents =
            h.fakes.list_documents_for_claim(&receipt.claim.id).await.expect("documents");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].file_name, "timesheet.pdf");
    }

    #[tokio::test]
    async fn metadata_outage_skips_uploads_but_keeps_the_claim() {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 250).await;
        h.fakes.fail_document_inserts();
        let ctx = ctx("lec-a", Role::Lecturer);

        let mut request = submission(3, 200);
        request.uploads = vec![Upload::new("timesheet.pdf", "application/pdf", b"%PDF".to_vec())];
        let receipt = h.service.submit_claim(&ctx, request).await.expect("claim still submitted");

        assert!(receipt.attachments.attached.is_empty());
        assert_eq!(receipt.attachments.skipped.len(), 1);
        assert!(matches!(
            receipt.attachments.skipped[0].reason,
            SkipReason::MetadataFailed { .. }
        ));
        let stored = h.fakes.find_claim(&receipt.claim.id).await.expect("find");
        assert_eq!(stored, Some(receipt.claim.clone()));

        let error = h
            .service
            .submit_claim(&ctx, submission(10, 150))
            .await
            .expect_err("the first 200 hours count toward the cap");
        assert_eq!(error.kind(), ErrorKind::ValidationFailed);
        assert!(error.to_string().contains("(350)"));
    }
}
