use chrono::Utc;
use serde::Serialize;

use super::ClaimService;
use crate::audit::{AuditCategory, AuditOutcome};
use crate::auth::{Action, RequestContext};
use crate::domain::claim::{Claim, ClaimId};
use crate::errors::WorkflowError;
use crate::lifecycle::{PaymentEvent, PaymentOutcome};

const EVENT_PAYMENT: &str = "claim.payment_updated";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaymentUpdate {
    pub claim: Claim,
    pub payment: PaymentOutcome,
}

impl ClaimService {
    pub async fn mark_processing(
        &self,
        ctx: &RequestContext,
        claim_id: &ClaimId,
    ) -> Result<PaymentUpdate, WorkflowError> {
        self.update_payment(ctx, claim_id, PaymentEvent::ProcessingStarted).await
    }

    pub async fn mark_paid(
        &self,
        ctx: &RequestContext,
        claim_id: &ClaimId,
    ) -> Result<PaymentUpdate, WorkflowError> {
        self.update_payment(ctx, claim_id, PaymentEvent::PaymentCompleted).await
    }

    /// Moves a fully approved claim along `Unpaid → Processing → Paid`. HR only.
    pub async fn update_payment(
        &self,
        ctx: &RequestContext,
        claim_id: &ClaimId,
        event: PaymentEvent,
    ) -> Result<PaymentUpdate, WorkflowError> {
        let attempt = async {
            ctx.subject.authorize(Action::UpdatePayment)?;
            let mut claim = self.load_claim(claim_id).await?;
            let payment = self
                .lifecycle
                .apply_payment(&mut claim, event, ctx.user_id(), Utc::now())
                .map_err(|source| WorkflowError::InvalidTransition {
                    claim_id: claim_id.0.clone(),
                    source,
                })?;
            let claim = self.claims.update_claim(claim).await?;
            Ok::<_, WorkflowError>(PaymentUpdate { claim, payment })
        };

        let update = attempt.await.map_err(|error| {
            self.refuse(ctx, Some(claim_id), EVENT_PAYMENT, AuditCategory::Payment, error)
        })?;

        tracing::info!(
            event_name = EVENT_PAYMENT,
            correlation_id = %ctx.correlation_id,
            claim_id = %update.claim.id,
            from = update.payment.from.as_str(),
            to = update.payment.to.as_str(),
            "payment status updated"
        );
        self.record(
            ctx,
            Some(&update.claim.id),
            EVENT_PAYMENT,
            AuditCategory::Payment,
            AuditOutcome::Success,
            &[
                ("from", update.payment.from.as_str().to_string()),
                ("to", update.payment.to.as_str().to_string()),
            ],
        );

        Ok(update)
    }
}
