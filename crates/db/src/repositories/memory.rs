use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use claimdesk_core::domain::claim::{Claim, ClaimId};
use claimdesk_core::domain::document::{Document, DocumentId};
use claimdesk_core::domain::profile::{Coordinator, Lecturer, LecturerId, Manager, UserId};
use claimdesk_core::ports::{ClaimFilter, ClaimStore, DocumentStore, ProfileStore, StoreError};

#[derive(Default)]
pub struct InMemoryClaimStore {
    claims: RwLock<HashMap<String, Claim>>,
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn find_claim(&self, id: &ClaimId) -> Result<Option<Claim>, StoreError> {
        let claims = self.claims.read().await;
        Ok(claims.get(&id.0).cloned())
    }

    async fn find_claims_by_lecturer_and_period(
        &self,
        lecturer_id: &LecturerId,
        month_start: NaiveDate,
        month_end: NaiveDate,
    ) -> Result<Vec<Claim>, StoreError> {
        let claims = self.claims.read().await;
        Ok(claims
            .values()
            .filter(|claim| &claim.lecturer_id == lecturer_id)
            .filter(|claim| (month_start..=month_end).contains(&claim.claim_date))
            .cloned()
            .collect())
    }

    async fn list_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, StoreError> {
        let claims = self.claims.read().await;
        let mut matching: Vec<Claim> =
            claims.values().filter(|claim| filter.matches(claim)).cloned().collect();
        filter.order.sort(&mut matching);
        if let Some(limit) = filter.limit {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }

    async fn insert_claim(&self, claim: Claim) -> Result<Claim, StoreError> {
        let mut claims = self.claims.write().await;
        claims.insert(claim.id.0.clone(), claim.clone());
        Ok(claim)
    }

    async fn update_claim(&self, mut claim: Claim) -> Result<Claim, StoreError> {
        let mut claims = self.claims.write().await;
        let stored = claims
            .get(&claim.id.0)
            .ok_or_else(|| StoreError::Missing { entity: "claim", id: claim.id.0.clone() })?;

        if stored.version != claim.version {
            return Err(StoreError::Conflict {
                claim_id: claim.id.0.clone(),
                expected_version: claim.version,
            });
        }

        // Creation-time fields stay as stored.
        let mut updated = stored.clone();
        updated.status = claim.status;
        updated.coordinator_approval = claim.coordinator_approval.take();
        updated.coordinator_notes = claim.coordinator_notes.take();
        updated.manager_approval = claim.manager_approval.take();
        updated.manager_notes = claim.manager_notes.take();
        updated.payment_status = claim.payment_status;
        updated.payment = claim.payment.take();
        updated.version += 1;

        claims.insert(updated.id.0.clone(), updated.clone());
        Ok(updated)
    }
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_document(&self, document: Document) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        documents.insert(document.id.0.clone(), document);
        Ok(())
    }

    async fn find_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id.0).cloned())
    }

    async fn list_documents_for_claim(
        &self,
        claim_id: &ClaimId,
    ) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.read().await;
        let mut attached: Vec<Document> =
            documents.values().filter(|document| &document.claim_id == claim_id).cloned().collect();
        attached.sort_by(|a, b| {
            a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(attached)
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    lecturers: RwLock<HashMap<String, Lecturer>>,
    coordinators: RwLock<HashMap<String, Coordinator>>,
    managers: RwLock<HashMap<String, Manager>>,
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_lecturer(&self, id: &LecturerId) -> Result<Option<Lecturer>, StoreError> {
        let lecturers = self.lecturers.read().await;
        Ok(lecturers.get(&id.0).cloned())
    }

    async fn find_lecturer_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Lecturer>, StoreError> {
        let lecturers = self.lecturers.read().await;
        Ok(lecturers.values().find(|lecturer| &lecturer.user_id == user_id).cloned())
    }

    async fn find_coordinator_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Coordinator>, StoreError> {
        let coordinators = self.coordinators.read().await;
        Ok(coordinators.values().find(|coordinator| &coordinator.user_id == user_id).cloned())
    }

    async fn find_manager_by_user(&self, user_id: &UserId) -> Result<Option<Manager>, StoreError> {
        let managers = self.managers.read().await;
        Ok(managers.values().find(|manager| &manager.user_id == user_id).cloned())
    }

    async fn save_lecturer(&self, lecturer: Lecturer) -> Result<(), StoreError> {
        let mut lecturers = self.lecturers.write().await;
        lecturers.insert(lecturer.id.0.clone(), lecturer);
        Ok(())
    }

    async fn save_coordinator(&self, coordinator: Coordinator) -> Result<(), StoreError> {
        let mut coordinators = self.coordinators.write().await;
        coordinators.insert(coordinator.id.0.clone(), coordinator);
        Ok(())
    }

    async fn save_manager(&self, manager: Manager) -> Result<(), StoreError> {
        let mut managers = self.managers.write().await;
        managers.insert(manager.id.0.clone(), manager);
        Ok(())
    }
}
