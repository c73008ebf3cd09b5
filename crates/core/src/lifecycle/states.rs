use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::domain::claim::{ClaimStatus, PaymentStatus};
use crate::domain::profile::{CoordinatorId, ManagerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimEvent {
    CoordinatorApproved,
    CoordinatorRejected,
    ManagerApproved,
    ManagerReturned,
    ManagerRejected,
}

impl ClaimEvent {
    pub fn actor_role(&self) -> Role {
        match self {
            Self::CoordinatorApproved | Self::CoordinatorRejected => Role::Coordinator,
            Self::ManagerApproved | Self::ManagerReturned | Self::ManagerRejected => Role::Manager,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEvent {
    ProcessingStarted,
    PaymentCompleted,
}

/// Whether HR must move a claim through `Processing` before marking it `Paid`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOrder {
    #[default]
    Strict,
    Relaxed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorVerdict {
    Approve,
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerVerdict {
    Approve,
    Return,
    Reject,
}

/// A reviewer's decision, carrying the reviewer's profile id for the approval stamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Review {
    Coordinator {
        coordinator_id: CoordinatorId,
        verdict: CoordinatorVerdict,
        notes: Option<String>,
    },
    Manager { manager_id: ManagerId, verdict: ManagerVerdict, notes: Option<String> },
}

impl Review {
    pub fn event(&self) -> ClaimEvent {
        match self {
            Self::Coordinator { verdict: CoordinatorVerdict::Approve, .. } => {
                ClaimEvent::CoordinatorApproved
            }
            Self::Coordinator { verdict: CoordinatorVerdict::Reject, .. } => {
                ClaimEvent::CoordinatorRejected
            }
            Self::Manager { verdict: ManagerVerdict::Approve, .. } => ClaimEvent::ManagerApproved,
            Self::Manager { verdict: ManagerVerdict::Return, .. } => ClaimEvent::ManagerReturned,
            Self::Manager { verdict: ManagerVerdict::Reject, .. } => ClaimEvent::ManagerRejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    pub event: ClaimEvent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub event: PaymentEvent,
}
