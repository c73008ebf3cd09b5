use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::claim::{Claim, ClaimStatus, PaymentStatus, Stamp};
use crate::domain::profile::UserId;
use crate::lifecycle::states::{
    ClaimEvent, PaymentEvent, PaymentOrder, PaymentOutcome, Review, TransitionOutcome,
};

pub const DEFAULT_COORDINATOR_REJECTION_NOTE: &str = "Rejected by coordinator";
pub const DEFAULT_MANAGER_REJECTION_NOTE: &str = "Rejected by manager";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: ClaimStatus, event: ClaimEvent },
    #[error("payment cannot change while the claim is {status:?}; it must be FullyApproved")]
    PaymentNotReachable { status: ClaimStatus },
    #[error("invalid payment transition from {state:?} using event {event:?}")]
    InvalidPaymentTransition { state: PaymentStatus, event: PaymentEvent },
}

/// Legal moves for a claim's `status` and `payment_status`.
///
/// The engine is pure: it decides and applies, it never loads, saves, or authorizes.
#[derive(Clone, Debug, Default)]
pub struct ClaimLifecycle {
    payment_order: PaymentOrder,
}

impl ClaimLifecycle {
    pub fn new(payment_order: PaymentOrder) -> Self {
        Self { payment_order }
    }

    pub fn initial_state(&self) -> ClaimStatus {
        ClaimStatus::Pending
    }

    pub fn payment_order(&self) -> PaymentOrder {
        self.payment_order
    }

    pub fn transition(
        &self,
        current: ClaimStatus,
        event: ClaimEvent,
    ) -> Result<TransitionOutcome, TransitionError> {
        use ClaimEvent::{
            CoordinatorApproved, CoordinatorRejected, ManagerApproved, ManagerRejected,
            ManagerReturned,
        };
        use ClaimStatus::{
            ApprovedByCoordinator, FullyApproved, Pending, Rejected, ReturnedToCoordinator,
        };

        let to = match (current, event) {
            (Pending | ReturnedToCoordinator, CoordinatorApproved) => ApprovedByCoordinator,
            (Pending | ReturnedToCoordinator, CoordinatorRejected) => Rejected,
            (ApprovedByCoordinator, ManagerApproved) => FullyApproved,
            (ApprovedByCoordinator, ManagerReturned) => ReturnedToCoordinator,
            (ApprovedByCoordinator, ManagerRejected) => Rejected,
            _ => return Err(TransitionError::InvalidTransition { state: current, event }),
        };

        Ok(TransitionOutcome { from: current, to, event })
    }

    pub fn payment_transition(
        &self,
        status: ClaimStatus,
        current: PaymentStatus,
        event: PaymentEvent,
    ) -> Result<PaymentOutcome, TransitionError> {
        if status != ClaimStatus::FullyApproved {
            return Err(TransitionError::PaymentNotReachable { status });
        }

        let to = match (current, event) {
            (PaymentStatus::Unpaid, PaymentEvent::ProcessingStarted) => PaymentStatus::Processing,
            (PaymentStatus::Processing, PaymentEvent::PaymentCompleted) => PaymentStatus::Paid,
            (PaymentStatus::Unpaid, PaymentEvent::PaymentCompleted)
                if self.payment_order == PaymentOrder::Relaxed =>
            {
                PaymentStatus::Paid
            }
            _ => return Err(TransitionError::InvalidPaymentTransition { state: current, event }),
        };

        Ok(PaymentOutcome { from: current, to, event })
    }

    /// Applies a review to `claim`. On error the claim is left untouched.
    pub fn apply_review(
        &self,
        claim: &mut Claim,
        review: &Review,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let outcome = self.transition(claim.status, review.event())?;

        match (review, outcome.event) {
            (
                Review::Coordinator { coordinator_id, notes, .. },
                ClaimEvent::CoordinatorApproved,
            ) => {
                claim.coordinator_approval = Some(Stamp::new(coordinator_id.clone(), at));
                claim.coordinator_notes = notes.clone();
            }
            (Review::Coordinator { notes, .. }, _) => {
                claim.coordinator_notes =
                    Some(note_or_default(notes, DEFAULT_COORDINATOR_REJECTION_NOTE));
            }
            (Review::Manager { manager_id, notes, .. }, ClaimEvent::ManagerApproved) => {
                claim.manager_approval = Some(Stamp::new(manager_id.clone(), at));
                claim.manager_notes = notes.clone();
            }
            (Review::Manager { notes, .. }, ClaimEvent::ManagerReturned) => {
                claim.manager_notes = notes.clone();
            }
            (Review::Manager { notes, .. }, _) => {
                claim.manager_notes = Some(note_or_default(notes, DEFAULT_MANAGER_REJECTION_NOTE));
            }
        }
        claim.status = outcome.to;

        Ok(outcome)
    }

    /// Applies a payment step on behalf of an HR user. Completing payment stamps the payer.
    pub fn apply_payment(
        &self,
        claim: &mut Claim,
        event: PaymentEvent,
        hr_user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<PaymentOutcome, TransitionError> {
        let outcome = self.payment_transition(claim.status, claim.payment_status, event)?;

        if outcome.to == PaymentStatus::Paid {
            claim.payment = Some(Stamp::new(hr_user.clone(), at));
        }
        claim.payment_status = outcome.to;

        Ok(outcome)
    }
}

fn note_or_default(notes: &Option<String>, default: &str) -> String {
    notes
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}
