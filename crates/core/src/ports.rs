//! Store contracts the claim service consumes. Implementations live in `claimdesk-db`.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::claim::{Claim, ClaimId, ClaimStatus, PaymentStatus};
use crate::domain::document::{Document, DocumentId};
use crate::domain::profile::{
    Coordinator, CoordinatorId, Lecturer, LecturerId, Manager, ManagerId, UserId,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("claim `{claim_id}` changed since version {expected_version} was read")]
    Conflict { claim_id: String, expected_version: u32 },
    #[error("{entity} `{id}` does not exist")]
    Missing { entity: &'static str, id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClaimOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    CoordinatorApprovalAsc,
    ManagerApprovalDesc,
    PaymentDesc,
}

impl ClaimOrder {
    pub fn sort(&self, claims: &mut [Claim]) {
        match self {
            Self::NewestFirst => claims.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| b.claim_date.cmp(&a.claim_date))
            }),
            Self::OldestFirst => claims.sort_by(|a, b| {
                a.created_at.cmp(&b.created_at).then_with(|| a.claim_date.cmp(&b.claim_date))
            }),
            Self::CoordinatorApprovalAsc => claims.sort_by(|a, b| {
                let left = a.coordinator_approval.as_ref().map(|stamp| stamp.at);
                let right = b.coordinator_approval.as_ref().map(|stamp| stamp.at);
                left.cmp(&right)
            }),
            Self::ManagerApprovalDesc => claims.sort_by(|a, b| {
                let left = a.manager_approval.as_ref().map(|stamp| stamp.at);
                let right = b.manager_approval.as_ref().map(|stamp| stamp.at);
                right.cmp(&left)
            }),
            Self::PaymentDesc => claims.sort_by(|a, b| {
                let left = a.payment.as_ref().map(|stamp| stamp.at);
                let right = b.payment.as_ref().map(|stamp| stamp.at);
                right.cmp(&left)
            }),
        }
    }
}

/// Conjunctive filter for listing claims. Empty `statuses` means any status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimFilter {
    pub lecturer_id: Option<LecturerId>,
    pub statuses: Vec<ClaimStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub approved_by_coordinator: Option<CoordinatorId>,
    pub approved_by_manager: Option<ManagerId>,
    pub order: ClaimOrder,
    pub limit: Option<u32>,
}

impl ClaimFilter {
    pub fn matches(&self, claim: &Claim) -> bool {
        if let Some(lecturer_id) = &self.lecturer_id {
            if &claim.lecturer_id != lecturer_id {
                return false;
            }
        }

        if !self.statuses.is_empty() && !self.statuses.contains(&claim.status) {
            return false;
        }

        if let Some(payment_status) = self.payment_status {
            if claim.payment_status != payment_status {
                return false;
            }
        }

        if let Some(coordinator_id) = &self.approved_by_coordinator {
            let approved_by = claim.coordinator_approval.as_ref().map(|stamp| &stamp.actor_id);
            if approved_by != Some(coordinator_id) {
                return false;
            }
        }

        if let Some(manager_id) = &self.approved_by_manager {
            let approved_by = claim.manager_approval.as_ref().map(|stamp| &stamp.actor_id);
            if approved_by != Some(manager_id) {
                return false;
            }
        }

        true
    }
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn find_claim(&self, id: &ClaimId) -> Result<Option<Claim>, StoreError>;

    /// Claims of one lecturer with `claim_date` in `[month_start, month_end]`, any status.
    async fn find_claims_by_lecturer_and_period(
        &self,
        lecturer_id: &LecturerId,
        month_start: NaiveDate,
        month_end: NaiveDate,
    ) -> Result<Vec<Claim>, StoreError>;

    async fn list_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, StoreError>;

    async fn insert_claim(&self, claim: Claim) -> Result<Claim, StoreError>;

    /// Writes the workflow fields of `claim` if the stored version still equals `claim.version`,
    /// returning the stored claim with its bumped version. A stale version yields
    /// [`StoreError::Conflict`]. Fields fixed at creation are never rewritten.
    async fn update_claim(&self, claim: Claim) -> Result<Claim, StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, document: Document) -> Result<(), StoreError>;
    async fn find_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError>;
    async fn list_documents_for_claim(
        &self,
        claim_id: &ClaimId,
    ) -> Result<Vec<Document>, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_lecturer(&self, id: &LecturerId) -> Result<Option<Lecturer>, StoreError>;
    async fn find_lecturer_by_user(&self, user_id: &UserId)
        -> Result<Option<Lecturer>, StoreError>;
    async fn find_coordinator_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Coordinator>, StoreError>;
    async fn find_manager_by_user(&self, user_id: &UserId) -> Result<Option<Manager>, StoreError>;
    async fn save_lecturer(&self, lecturer: Lecturer) -> Result<(), StoreError>;
    async fn save_coordinator(&self, coordinator: Coordinator) -> Result<(), StoreError>;
    async fn save_manager(&self, manager: Manager) -> Result<(), StoreError>;
}
