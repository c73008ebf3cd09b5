use std::collections::HashMap;

use serde::Serialize;

use super::ClaimService;
use crate::audit::{AuditCategory, AuditOutcome};
use crate::auth::{Action, RequestContext};
use crate::domain::claim::{Claim, ClaimId, ClaimStatus};
use crate::domain::profile::Lecturer;
use crate::errors::{ValidationFailure, WorkflowError};
use crate::ports::{ClaimFilter, ClaimOrder};
use crate::reports::{ClaimReportRow, ReportKind};

const EVENT_REPORT: &str = "report.generated";
const NOTHING_REVIEWED: &str = "No claims have been reviewed yet.";
const NOTHING_SUBMITTED: &str = "You have no claims to generate a report for.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportRequest {
    Payroll,
    Financial,
    MyClaims,
    CoordinatorReview,
    ManagerReview,
    Invoice(ClaimId),
}

impl ReportRequest {
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::Payroll => ReportKind::Payroll,
            Self::Financial => ReportKind::Financial,
            Self::MyClaims => ReportKind::LecturerClaims,
            Self::CoordinatorReview => ReportKind::CoordinatorReview,
            Self::ManagerReview => ReportKind::ManagerReview,
            Self::Invoice(_) => ReportKind::Invoice,
        }
    }

    fn claim_id(&self) -> Option<&ClaimId> {
        match self {
            Self::Invoice(claim_id) => Some(claim_id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportOutput {
    pub kind: ReportKind,
    pub file_name: String,
    pub content_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub claim_count: usize,
}

impl ClaimService {
    /// Selects the claims a report covers for the caller and hands them to the report generator.
    pub async fn generate_report(
        &self,
        ctx: &RequestContext,
        request: ReportRequest,
    ) -> Result<ReportOutput, WorkflowError> {
        let kind = request.kind();
        let claim_id = request.claim_id().cloned();

        let attempt = async {
            let claims = self.select_report_claims(ctx, &request).await?;
            let rows = self.report_rows(&claims).await?;
            let bytes = self
                .reports
                .render(kind, &rows)
                .map_err(|error| WorkflowError::dependency("report", error.to_string()))?;
            Ok::<_, WorkflowError>((rows.len(), bytes))
        };

        let (claim_count, bytes) = attempt.await.map_err(|error| {
            self.refuse(ctx, claim_id.as_ref(), EVENT_REPORT, AuditCategory::Report, error)
        })?;

        let file_name = match &claim_id {
            Some(claim_id) => format!("{}_{}.{}", kind.as_str(), claim_id, kind.file_extension()),
            None => format!(
                "{}_{}.{}",
                kind.as_str(),
                chrono::Utc::now().format("%Y%m%d"),
                kind.file_extension()
            ),
        };

        tracing::info!(
            event_name = EVENT_REPORT,
            correlation_id = %ctx.correlation_id,
            report = kind.as_str(),
            claim_count,
            bytes = bytes.len(),
            "report generated"
        );
        self.record(
            ctx,
            claim_id.as_ref(),
            EVENT_REPORT,
            AuditCategory::Report,
            AuditOutcome::Success,
            &[("report", kind.as_str().to_string()), ("claim_count", claim_count.to_string())],
        );

        Ok(ReportOutput {
            kind,
            file_name,
            content_type: kind.content_type(),
            bytes,
            claim_count,
        })
    }

    async fn select_report_claims(
        &self,
        ctx: &RequestContext,
        request: &ReportRequest,
    ) -> Result<Vec<Claim>, WorkflowError> {
        let claims = match request {
            ReportRequest::Payroll => {
                ctx.subject.authorize(Action::PayrollReport)?;
                self.claims
                    .list_claims(&ClaimFilter {
                        statuses: vec![ClaimStatus::FullyApproved],
                        order: ClaimOrder::ManagerApprovalDesc,
                        ..ClaimFilter::default()
                    })
                    .await?
            }
            ReportRequest::Financial => {
                ctx.subject.authorize(Action::FinancialReport)?;
                self.claims.list_claims(&ClaimFilter::default()).await?
            }
            ReportRequest::MyClaims => {
                ctx.subject.authorize(Action::ListOwnClaims)?;
                let lecturer = self.active_lecturer(ctx).await?;
                let claims = self
                    .claims
                    .list_claims(&ClaimFilter {
                        lecturer_id: Some(lecturer.id),
                        ..ClaimFilter::default()
                    })
                    .await?;
                non_empty(claims, NOTHING_SUBMITTED)?
            }
            ReportRequest::CoordinatorReview => {
                ctx.subject.authorize(Action::CoordinatorReport)?;
                let coordinator = self.active_coordinator(ctx).await?;
                let claims = self
                    .claims
                    .list_claims(&ClaimFilter {
                        approved_by_coordinator: Some(coordinator.id),
                        order: ClaimOrder::CoordinatorApprovalAsc,
                        ..ClaimFilter::default()
                    })
                    .await?;
                non_empty(claims, NOTHING_REVIEWED)?
            }
            ReportRequest::ManagerReview => {
                ctx.subject.authorize(Action::ManagerReport)?;
                let manager = self.active_manager(ctx).await?;
                let claims = self
                    .claims
                    .list_claims(&ClaimFilter {
                        approved_by_manager: Some(manager.id),
                        order: ClaimOrder::ManagerApprovalDesc,
                        ..ClaimFilter::default()
                    })
                    .await?;
                non_empty(claims, NOTHING_REVIEWED)?
            }
            ReportRequest::Invoice(claim_id) => {
                let claim = self.load_claim(claim_id).await?;
                self.authorize_read(ctx, &claim).await?;
                vec![claim]
            }
        };
        Ok(claims)
    }

    async fn report_rows(&self, claims: &[Claim]) -> Result<Vec<ClaimReportRow>, WorkflowError> {
        let mut lecturers: HashMap<String, Option<Lecturer>> = HashMap::new();
        let mut rows = Vec::with_capacity(claims.len());

        for claim in claims {
            if !lecturers.contains_key(&claim.lecturer_id.0) {
                let lecturer = self.profiles.find_lecturer(&claim.lecturer_id).await?;
                lecturers.insert(claim.lecturer_id.0.clone(), lecturer);
            }
            let lecturer = lecturers.get(&claim.lecturer_id.0).and_then(Option::as_ref);
            rows.push(ClaimReportRow::new(claim, lecturer));
        }

        Ok(rows)
    }
}

fn non_empty(claims: Vec<Claim>, message: &str) -> Result<Vec<Claim>, WorkflowError> {
    if claims.is_empty() {
        return Err(ValidationFailure::NothingToReport(message.to_string()).into());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::ReportRequest;
    use crate::auth::Role;
    use crate::domain::claim::ClaimId;
    use crate::errors::{ErrorKind, ValidationFailure, WorkflowError};
    use crate::lifecycle::{CoordinatorVerdict, ManagerVerdict};
    use crate::reports::ReportKind;
    use crate::service::testing::{coordinator, ctx, harness, lecturer, manager, Harness};
    use crate::service::ClaimSubmission;

    async fn submit(h: &Harness, user: &str, day: u32, hours: i64) -> ClaimId {
        h.service
            .submit_claim(
                &ctx(user, Role::Lecturer),
                ClaimSubmission {
                    claim_date: NaiveDate::from_ymd_opt(2026, 5, day).expect("valid date"),
                    hours_worked: Decimal::from(hours),
                    description: format!("Tutorial block {day}"),
                    department: None,
                    uploads: Vec::new(),
                },
            )
            .await
            .expect("submitted")
            .claim
            .id
    }

    async fn approve(h: &Harness, id: &ClaimId) {
        h.service
            .coordinator_review(
                &ctx("pc-1", Role::Coordinator),
                id,
                CoordinatorVerdict::Approve,
                Some("Timesheet checked".to_string()),
            )
            .await
            .expect("coordinator approves");
        h.service
            .manager_review(&ctx("am-1", Role::Manager), id, ManagerVerdict::Approve, None)
            .await
            .expect("manager approves");
    }

    async fn staffed() -> Harness {
        let h = harness();
        lecturer(&h.fakes, "lec-a", 250).await;
        coordinator(&h.fakes, "pc-1").await;
        manager(&h.fakes, "am-1").await;
        h
    }

    #[tokio::test]
    async fn payroll_lists_only_fully_approved_claims() {
        let h = staffed().await;
        let approved = submit(&h, "lec-a", 1, 4).await;
        submit(&h, "lec-a", 2, 6).await;
        approve(&h, &approved).await;

        let output = h
            .service
            .generate_report(&ctx("hr-1", Role::Hr), ReportRequest::Payroll)
            .await
            .expect("payroll");
        assert_eq!(output.kind, ReportKind::Payroll);
        assert_eq!(output.content_type, "text/csv");
        assert_eq!(output.claim_count, 1);
        assert!(output.file_name.ends_with(".csv"));

        let text = String::from_utf8(output.bytes).expect("utf-8");
        assert!(text.contains(&approved.0));
        assert!(text.contains("lec-a@example.edu"));
        assert!(text.contains("1000.00"));
    }

    #[tokio::test]
    async fn financial_summary_counts_every_claim() {
        let h = staffed().await;
        let paid = submit(&h, "lec-a", 1, 2).await;
        submit(&h, "lec-a", 2, 3).await;
        approve(&h, &paid).await;
        let hr = ctx("hr-1", Role::Hr);
        h.service.mark_processing(&hr, &paid).await.expect("processing");
        h.service.mark_paid(&hr, &paid).await.expect("paid");

        let output =
            h.service.generate_report(&hr, ReportRequest::Financial).await.expect("financial");
        let text = String::from_utf8(output.bytes).expect("utf-8");
        assert!(text.contains("Total claims: 2"));
        assert!(text.contains("Paid: 1"));
        assert!(text.contains("Total amount: 1250.00"));

        let lecturer_attempt = h
            .service
            .generate_report(&ctx("lec-a", Role::Lecturer), ReportRequest::Financial)
            .await
            .expect_err("HR only");
        assert_eq!(lecturer_attempt.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn empty_reviewer_reports_are_refused_with_a_message() {
        let h = staffed().await;
        submit(&h, "lec-a", 1, 2).await;

        let error = h
            .service
            .generate_report(&ctx("pc-1", Role::Coordinator), ReportRequest::CoordinatorReview)
            .await
            .expect_err("nothing reviewed");
        assert_eq!(
            error,
            WorkflowError::ValidationFailed(ValidationFailure::NothingToReport(
                "No claims have been reviewed yet.".to_string()
            ))
        );

        let error = h
            .service
            .generate_report(&ctx("lec-b", Role::Lecturer), ReportRequest::MyClaims)
            .await
            .expect_err("lec-b has no profile");
        assert_eq!(error.kind(), ErrorKind::ProfileNotFound);
    }

    #[tokio::test]
    async fn reviewer_reports_cover_their_own_approvals() {
        let h = staffed().await;
        let approved = submit(&h, "lec-a", 1, 2).await;
        approve(&h, &approved).await;

        let coordinator_report = h
            .service
            .generate_report(&ctx("pc-1", Role::Coordinator), ReportRequest::CoordinatorReview)
            .await
            .expect("coordinator report");
        assert_eq!(coordinator_report.claim_count, 1);
        let text = String::from_utf8(coordinator_report.bytes).expect("utf-8");
        assert!(text.contains("Timesheet checked"));

        let manager_report = h
            .service
            .generate_report(&ctx("am-1", Role::Manager), ReportRequest::ManagerReview)
            .await
            .expect("manager report");
        assert_eq!(manager_report.claim_count, 1);

        let mine = h
            .service
            .generate_report(&ctx("lec-a", Role::Lecturer), ReportRequest::MyClaims)
            .await
            .expect("lecturer report");
        assert_eq!(mine.kind, ReportKind::LecturerClaims);
    }

    #[tokio::test]
    async fn invoice_respects_the_read_gate() {
        let h = staffed().await;
        lecturer(&h.fakes, "lec-b", 250).await;
        let claim = submit(&h, "lec-a", 3, 8).await;

        let invoice = h
            .service
            .generate_report(&ctx("lec-a", Role::Lecturer), ReportRequest::Invoice(claim.clone()))
            .await
            .expect("owner invoice");
        assert!(invoice.file_name.contains(&claim.0));
        let text = String::from_utf8(invoice.bytes).expect("utf-8");
        assert!(text.contains("Amount due:"));
        assert!(text.contains("2000.00"));

        let error = h
            .service
            .generate_report(&ctx("lec-b", Role::Lecturer), ReportRequest::Invoice(claim))
            .await
            .expect_err("not the owner");
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        let missing = h
            .service
            .generate_report(
                &ctx("hr-1", Role::Hr),
                ReportRequest::Invoice(ClaimId("999".to_string())),
            )
            .await
            .expect_err("no such claim");
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }
}
