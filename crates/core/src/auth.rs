//! Roles, per-action capability checks, and the identity port.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::profile::UserId;
use crate::errors::WorkflowError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Lecturer,
    Coordinator,
    Manager,
    Hr,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lecturer => "lecturer",
            Self::Coordinator => "coordinator",
            Self::Manager => "manager",
            Self::Hr => "hr",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lecturer" => Some(Self::Lecturer),
            "coordinator" | "programmecoordinator" | "programme_coordinator" => {
                Some(Self::Coordinator)
            }
            "manager" | "academicmanager" | "academic_manager" => Some(Self::Manager),
            "hr" => Some(Self::Hr),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Roles that may read any claim regardless of ownership.
    pub fn reads_all_claims(&self) -> bool {
        matches!(self, Self::Coordinator | Self::Manager | Self::Hr | Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations gated by role. Each declares its allowed role set explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SubmitClaim,
    ListOwnClaims,
    CoordinatorReview,
    ManagerReview,
    UpdatePayment,
    ViewCoordinatorQueue,
    ViewManagerQueue,
    ViewPaymentQueue,
    PayrollReport,
    FinancialReport,
    CoordinatorReport,
    ManagerReport,
    AdministerProfiles,
}

impl Action {
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::SubmitClaim | Self::ListOwnClaims => &[Role::Lecturer],
            Self::CoordinatorReview | Self::ViewCoordinatorQueue | Self::CoordinatorReport => {
                &[Role::Coordinator]
            }
            Self::ManagerReview | Self::ViewManagerQueue | Self::ManagerReport => &[Role::Manager],
            Self::UpdatePayment
            | Self::ViewPaymentQueue
            | Self::PayrollReport
            | Self::FinancialReport => &[Role::Hr],
            Self::AdministerProfiles => &[Role::Hr, Role::Admin],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitClaim => "submit_claim",
            Self::ListOwnClaims => "list_own_claims",
            Self::CoordinatorReview => "coordinator_review",
            Self::ManagerReview => "manager_review",
            Self::UpdatePayment => "update_payment",
            Self::ViewCoordinatorQueue => "view_coordinator_queue",
            Self::ViewManagerQueue => "view_manager_queue",
            Self::ViewPaymentQueue => "view_payment_queue",
            Self::PayrollReport => "payroll_report",
            Self::FinancialReport => "financial_report",
            Self::CoordinatorReport => "coordinator_report",
            Self::ManagerReport => "manager_report",
            Self::AdministerProfiles => "administer_profiles",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified identity attached to a request by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Subject {
    pub fn new(user_id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        let mut roles: Vec<Role> = roles.into_iter().collect();
        roles.dedup();
        Self { user_id: UserId(user_id.into()), roles }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn may(&self, action: Action) -> bool {
        action.allowed_roles().iter().any(|role| self.has_role(*role))
    }

    pub fn authorize(&self, action: Action) -> Result<(), WorkflowError> {
        if self.may(action) {
            return Ok(());
        }

        Err(WorkflowError::Unauthorized { user_id: self.user_id.0.clone(), action })
    }
}

/// Resolves the subject of the current request.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Subject;
}

/// Identity fixed at construction, for in-process callers such as the CLI.
#[derive(Clone, Debug)]
pub struct StaticIdentity {
    subject: Subject,
}

impl StaticIdentity {
    pub fn new(subject: Subject) -> Self {
        Self { subject }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Subject {
        self.subject.clone()
    }
}

/// Subject plus the correlation id threaded through logs and audit events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub subject: Subject,
    pub correlation_id: String,
}

impl RequestContext {
    pub fn new(subject: Subject) -> Self {
        Self { subject, correlation_id: format!("req-{}", Uuid::new_v4().simple()) }
    }

    pub fn from_identity(identity: &dyn IdentityProvider) -> Self {
        Self::new(identity.current_user())
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn user_id(&self) -> &UserId {
        &self.subject.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, IdentityProvider, RequestContext, Role, StaticIdentity, Subject};
    use crate::errors::{ErrorKind, WorkflowError};

    #[test]
    fn each_review_action_admits_only_its_reviewer_role() {
        let coordinator = Subject::new("pc-1", [Role::Coordinator]);
        let manager = Subject::new("am-1", [Role::Manager]);

        assert!(coordinator.may(Action::CoordinatorReview));
        assert!(!coordinator.may(Action::ManagerReview));
        assert!(manager.may(Action::ManagerReview));
        assert!(!manager.may(Action::CoordinatorReview));
    }

    #[test]
    fn authorize_reports_unauthorized_kind() {
        let lecturer = Subject::new("lec-1", [Role::Lecturer]);
        let error = lecturer.authorize(Action::UpdatePayment).expect_err("lecturers cannot pay");

        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        assert!(matches!(
            error,
            WorkflowError::Unauthorized { action: Action::UpdatePayment, .. }
        ));
    }

    #[test]
    fn role_parse_accepts_legacy_names() {
        assert_eq!(Role::parse("ProgrammeCoordinator"), Some(Role::Coordinator));
        assert_eq!(Role::parse("AcademicManager"), Some(Role::Manager));
        assert_eq!(Role::parse("HR"), Some(Role::Hr));
        assert_eq!(Role::parse("dean"), None);
    }

    #[test]
    fn request_context_takes_subject_from_identity() {
        let identity = StaticIdentity::new(Subject::new("hr-1", [Role::Hr]));
        let context = RequestContext::from_identity(&identity).with_correlation_id("req-7");

        assert_eq!(context.user_id().0, "hr-1");
        assert_eq!(context.correlation_id, "req-7");
        assert_eq!(identity.current_user().roles, vec![Role::Hr]);
    }
}
