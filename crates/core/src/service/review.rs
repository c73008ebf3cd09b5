use chrono::Utc;
use serde::Serialize;

use super::ClaimService;
use crate::audit::{AuditCategory, AuditOutcome};
use crate::auth::{Action, RequestContext};
use crate::domain::claim::{Claim, ClaimId};
use crate::errors::WorkflowError;
use crate::lifecycle::{CoordinatorVerdict, ManagerVerdict, Review, TransitionOutcome};

const EVENT_REVIEWED: &str = "claim.reviewed";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewOutcome {
    pub claim: Claim,
    pub transition: TransitionOutcome,
}

impl ClaimService {
    /// First-tier review. The caller needs the coordinator role and an active coordinator
    /// profile; both are checked before the claim's state is considered.
    pub async fn coordinator_review(
        &self,
        ctx: &RequestContext,
        claim_id: &ClaimId,
        verdict: CoordinatorVerdict,
        notes: Option<String>,
    ) -> Result<ReviewOutcome, WorkflowError> {
        let attempt = async {
            ctx.subject.authorize(Action::CoordinatorReview)?;
            let coordinator = self.active_coordinator(ctx).await?;
            let review = Review::Coordinator { coordinator_id: coordinator.id, verdict, notes };
            self.apply_review(ctx, claim_id, review).await
        };

        attempt.await.map_err(|error| {
            self.refuse(ctx, Some(claim_id), EVENT_REVIEWED, AuditCategory::Review, error)
        })
    }

    /// Second-tier review of a coordinator-approved claim: approve, return, or reject.
    pub async fn manager_review(
        &self,
        ctx: &RequestContext,
        claim_id: &ClaimId,
        verdict: ManagerVerdict,
        notes: Option<String>,
    ) -> Result<ReviewOutcome, WorkflowError> {
        let attempt = async {
            ctx.subject.authorize(Action::ManagerReview)?;
            let manager = self.active_manager(ctx).await?;
            let review = Review::Manager { manager_id: manager.id, verdict, notes };
            self.apply_review(ctx, claim_id, review).await
        };

        attempt.await.map_err(|error| {
            self.refuse(ctx, Some(claim_id), EVENT_REVIEWED, AuditCategory::Review, error)
        })
    }

    /// Loads, transitions, and writes back under the claim's version. A reviewer who loses a race
    /// gets `Conflict` and nothing from their attempt is stored.
    async fn apply_review(
        &self,
        ctx: &RequestContext,
        claim_id: &ClaimId,
        review: Review,
    ) -> Result<ReviewOutcome, WorkflowError> {
        let mut claim = self.load_claim(claim_id).await?;
        let transition = self
            .lifecycle
            .apply_review(&mut claim, &review, Utc::now())
            .map_err(|source| WorkflowError::InvalidTransition {
                claim_id: claim_id.0.clone(),
                source,
            })?;
        let claim = self.claims.update_claim(claim).await?;

        tracing::info!(
            event_name = EVENT_REVIEWED,
            correlation_id = %ctx.correlation_id,
            claim_id = %claim.id,
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            event = ?transition.event,
            "claim transition applied"
        );
        self.record(
            ctx,
            Some(&claim.id),
            EVENT_REVIEWED,
            AuditCategory::Review,
            AuditOutcome::Success,
            &[
                ("from", transition.from.as_str().to_string()),
                ("to", transition.to.as_str().to_string()),
                ("role", transition.event.actor_role().as_str().to_string()),
            ],
        );

        Ok(ReviewOutcome { claim, transition })
    }
}
