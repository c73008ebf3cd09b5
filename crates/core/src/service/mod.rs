//! Claim workflow orchestration.
//!
//! `ClaimService` authorizes the caller, resolves their role profile, loads state through the store
//! ports, runs the pure validators and lifecycle engine, persists the result, and appends audit
//! events. Each public operation lives in the submodule named for it.

mod payment;
mod profiles;
mod queries;
mod reports;
mod review;
mod submission;

use std::sync::Arc;

use rust_decimal::Decimal;

pub use payment::PaymentUpdate;
pub use profiles::{NewProfile, ProfileKind, RegisteredProfile};
pub use queries::{ClaimDetails, DocumentDownload, PaymentQueue};
pub use reports::{ReportOutput, ReportRequest};
pub use review::ReviewOutcome;
pub use submission::{ClaimSubmission, SubmissionReceipt};

use crate::attachments::DocumentAttachmentManager;
use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::auth::{RequestContext, Role};
use crate::config::{AppConfig, WorkflowConfig, DEFAULT_MAX_DOCUMENT_BYTES};
use crate::domain::claim::{Claim, ClaimId};
use crate::domain::profile::{Coordinator, Lecturer, Manager};
use crate::errors::WorkflowError;
use crate::hours_cap::HoursCapValidator;
use crate::lifecycle::ClaimLifecycle;
use crate::ports::{ClaimStore, DocumentStore, ProfileStore};
use crate::reports::ReportGenerator;
use crate::storage::StorageSink;

/// Limits applied to a submission before the hours ceiling is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowPolicy {
    pub max_hours_per_claim: Decimal,
    pub max_hourly_rate: Decimal,
    pub max_description_len: usize,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self::from(&AppConfig::default().workflow)
    }
}

impl From<&WorkflowConfig> for WorkflowPolicy {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            max_hours_per_claim: Decimal::from(config.max_hours_per_claim),
            max_hourly_rate: Decimal::from(config.max_hourly_rate),
            max_description_len: config.max_description_len,
        }
    }
}

/// Store ports the service reads and writes through.
#[derive(Clone)]
pub struct Stores {
    pub claims: Arc<dyn ClaimStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

#[derive(Clone)]
pub struct ClaimService {
    claims: Arc<dyn ClaimStore>,
    documents: Arc<dyn DocumentStore>,
    profiles: Arc<dyn ProfileStore>,
    storage: Arc<dyn StorageSink>,
    attachments: DocumentAttachmentManager,
    reports: Arc<dyn ReportGenerator>,
    audit: Arc<dyn AuditSink>,
    lifecycle: ClaimLifecycle,
    hours_cap: HoursCapValidator,
    policy: WorkflowPolicy,
}

impl ClaimService {
    pub fn new(
        stores: Stores,
        storage: Arc<dyn StorageSink>,
        reports: Arc<dyn ReportGenerator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let attachments = DocumentAttachmentManager::new(storage.clone(), stores.documents.clone())
            .with_max_bytes(DEFAULT_MAX_DOCUMENT_BYTES);

        Self {
            claims: stores.claims,
            documents: stores.documents,
            profiles: stores.profiles,
            storage,
            attachments,
            reports,
            audit,
            lifecycle: ClaimLifecycle::default(),
            hours_cap: HoursCapValidator::default(),
            policy: WorkflowPolicy::default(),
        }
    }

    /// Applies the workflow limits, payment order, and document ceiling from `config`.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        self.lifecycle = ClaimLifecycle::new(config.workflow.payment_order);
        self.hours_cap = HoursCapValidator::new(Decimal::from(config.workflow.monthly_hours_cap));
        self.policy = WorkflowPolicy::from(&config.workflow);
        self.attachments = self.attachments.with_max_bytes(config.storage.max_document_bytes);
        self
    }

    pub fn lifecycle(&self) -> &ClaimLifecycle {
        &self.lifecycle
    }

    pub fn hours_cap(&self) -> &HoursCapValidator {
        &self.hours_cap
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    async fn active_lecturer(&self, ctx: &RequestContext) -> Result<Lecturer, WorkflowError> {
        match self.profiles.find_lecturer_by_user(ctx.user_id()).await? {
            Some(lecturer) if lecturer.active => Ok(lecturer),
            _ => Err(profile_not_found(Role::Lecturer, ctx)),
        }
    }

    async fn active_coordinator(&self, ctx: &RequestContext) -> Result<Coordinator, WorkflowError> {
        match self.profiles.find_coordinator_by_user(ctx.user_id()).await? {
            Some(coordinator) if coordinator.active => Ok(coordinator),
            _ => Err(profile_not_found(Role::Coordinator, ctx)),
        }
    }

    async fn active_manager(&self, ctx: &RequestContext) -> Result<Manager, WorkflowError> {
        match self.profiles.find_manager_by_user(ctx.user_id()).await? {
            Some(manager) if manager.active => Ok(manager),
            _ => Err(profile_not_found(Role::Manager, ctx)),
        }
    }

    async fn load_claim(&self, claim_id: &ClaimId) -> Result<Claim, WorkflowError> {
        self.claims
            .find_claim(claim_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("claim", claim_id.0.clone()))
    }

    fn record(
        &self,
        ctx: &RequestContext,
        claim_id: Option<&ClaimId>,
        event_type: &str,
        category: AuditCategory,
        outcome: AuditOutcome,
        metadata: &[(&str, String)],
    ) {
        let event = metadata.iter().fold(
            AuditEvent::for_request(ctx, claim_id.cloned(), event_type, category, outcome),
            |event, (key, value)| event.with_metadata(*key, value.clone()),
        );
        self.audit.emit(event);
    }

    /// Audits and logs a refused operation, then hands the error back.
    fn refuse(
        &self,
        ctx: &RequestContext,
        claim_id: Option<&ClaimId>,
        event_type: &str,
        category: AuditCategory,
        error: WorkflowError,
    ) -> WorkflowError {
        let outcome = if matches!(error, WorkflowError::DependencyFailure { .. }) {
            AuditOutcome::Failed
        } else {
            AuditOutcome::Rejected
        };
        let claim = claim_id.map(|id| id.0.as_str()).unwrap_or("-");

        if outcome == AuditOutcome::Failed {
            tracing::error!(
                event_name = event_type,
                correlation_id = %ctx.correlation_id,
                claim_id = claim,
                error = %error,
                "operation failed on a dependency"
            );
        } else {
            tracing::warn!(
                event_name = event_type,
                correlation_id = %ctx.correlation_id,
                claim_id = claim,
                error_kind = error.kind().as_str(),
                error = %error,
                "operation refused"
            );
        }

        self.record(
            ctx,
            claim_id,
            event_type,
            category,
            outcome,
            &[("error_kind", error.kind().as_str().to_string())],
        );
        error
    }
}

fn profile_not_found(role: Role, ctx: &RequestContext) -> WorkflowError {
    WorkflowError::ProfileNotFound { role, user_id: ctx.user_id().0.clone() }
}
