use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::auth::{Action, Role};
use crate::lifecycle::TransitionError;
use crate::ports::StoreError;

/// Input problems detected before any state is touched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error(
        "Total hours for this month ({projected_total}) exceeds the maximum of {ceiling} hours. You have {remaining} hours remaining."
    )]
    HoursCapExceeded { projected_total: Decimal, ceiling: Decimal, remaining: Decimal },
    #[error("hours worked must be greater than 0 and at most {max}, got {hours}")]
    HoursOutOfRange { hours: Decimal, max: Decimal },
    #[error("hourly rate {rate} on the lecturer profile is outside 0..={max}")]
    RateOutOfRange { rate: Decimal, max: Decimal },
    #[error("description is required")]
    DescriptionMissing,
    #[error("description is {len} characters; the limit is {max}")]
    DescriptionTooLong { len: usize, max: usize },
    #[error("{0}")]
    NothingToReport(String),
    #[error("{0}")]
    Malformed(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationFailure),
    #[error("user `{user_id}` does not hold a role permitted to {action}")]
    Unauthorized { user_id: String, action: Action },
    #[error("user `{user_id}` may not access claim `{claim_id}`")]
    Forbidden { user_id: String, claim_id: String },
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("no active {role} profile is linked to user `{user_id}`")]
    ProfileNotFound { role: Role, user_id: String },
    #[error("claim `{claim_id}`: {source}")]
    InvalidTransition { claim_id: String, source: TransitionError },
    #[error("claim `{claim_id}` was changed by another reviewer; reload and retry")]
    Conflict { claim_id: String },
    #[error("{dependency} failure: {message}")]
    DependencyFailure { dependency: &'static str, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationFailed,
    Unauthorized,
    Forbidden,
    NotFound,
    ProfileNotFound,
    InvalidTransition,
    Conflict,
    DependencyFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::ProfileNotFound => "profile_not_found",
            Self::InvalidTransition => "invalid_transition",
            Self::Conflict => "conflict",
            Self::DependencyFailure => "dependency_failure",
        }
    }
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ProfileNotFound { .. } => ErrorKind::ProfileNotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::DependencyFailure { .. } => ErrorKind::DependencyFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::DependencyFailure)
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn dependency(dependency: &'static str, message: impl Into<String>) -> Self {
        Self::DependencyFailure { dependency, message: message.into() }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let kind = self.kind();
        let message = self.to_string();
        match kind {
            ErrorKind::ValidationFailed | ErrorKind::InvalidTransition => {
                InterfaceError::BadRequest { kind, message, correlation_id }
            }
            ErrorKind::Unauthorized => {
                InterfaceError::Unauthorized { kind, message, correlation_id }
            }
            ErrorKind::Forbidden => InterfaceError::Forbidden { kind, message, correlation_id },
            ErrorKind::NotFound | ErrorKind::ProfileNotFound => {
                InterfaceError::NotFound { kind, message, correlation_id }
            }
            ErrorKind::Conflict => InterfaceError::Conflict { kind, message, correlation_id },
            ErrorKind::DependencyFailure => {
                InterfaceError::ServiceUnavailable { kind, message, correlation_id }
            }
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { claim_id, .. } => Self::Conflict { claim_id },
            StoreError::Missing { entity, id } => Self::NotFound { entity, id },
            StoreError::Unavailable(message) => {
                Self::DependencyFailure { dependency: "store", message }
            }
        }
    }
}

/// Caller-facing error shape handed to whatever layer renders responses. Each variant keeps
/// the [`ErrorKind`] it was built from, so callers can tell a bad input from an illegal
/// transition, or a missing record from a missing profile.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { kind: ErrorKind, message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { kind: ErrorKind, message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { kind: ErrorKind, message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { kind: ErrorKind, message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { kind: ErrorKind, message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { kind: ErrorKind, message: String, correlation_id: String },
}

impl InterfaceError {
    /// Safe to show an end user. Validation messages are passed through because they carry the
    /// figures the user needs to correct the input; dependency details never are.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } => message.clone(),
            Self::Unauthorized { .. } => {
                "You do not have permission to perform this action.".to_string()
            }
            Self::Forbidden { .. } => "You can only access your own claims.".to_string(),
            Self::NotFound { kind: ErrorKind::ProfileNotFound, .. } => {
                "No active profile is linked to your account.".to_string()
            }
            Self::NotFound { .. } => "The requested record could not be found.".to_string(),
            Self::Conflict { .. } => {
                "This claim was updated by someone else. Reload it and try again.".to_string()
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly.".to_string()
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest { kind, .. }
            | Self::Unauthorized { kind, .. }
            | Self::Forbidden { kind, .. }
            | Self::NotFound { kind, .. }
            | Self::Conflict { kind, .. }
            | Self::ServiceUnavailable { kind, .. } => *kind,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::auth::{Action, Role};
    use crate::domain::claim::ClaimStatus;
    use crate::errors::{ErrorKind, InterfaceError, ValidationFailure, WorkflowError};
    use crate::lifecycle::{ClaimEvent, TransitionError};
    use crate::ports::StoreError;

    #[test]
    fn hours_cap_message_reports_would_be_total_and_remaining() {
        let failure = ValidationFailure::HoursCapExceeded {
            projected_total: Decimal::from(185),
            ceiling: Decimal::from(180),
            remaining: Decimal::from(5),
        };

        let message = WorkflowError::from(failure).to_string();
        assert!(message.contains("(185)"));
        assert!(message.contains("exceeds the maximum of 180 hours"));
        assert!(message.contains("You have 5 hours remaining"));
    }

    #[test]
    fn every_kind_maps_to_a_distinct_interface_error() {
        let cases = [
            (
                WorkflowError::from(ValidationFailure::DescriptionMissing),
                ErrorKind::ValidationFailed,
            ),
            (
                WorkflowError::Unauthorized {
                    user_id: "u".to_string(),
                    action: Action::ManagerReview,
                },
                ErrorKind::Unauthorized,
            ),
            (
                WorkflowError::Forbidden { user_id: "u".to_string(), claim_id: "c".to_string() },
                ErrorKind::Forbidden,
            ),
            (WorkflowError::not_found("claim", "999"), ErrorKind::NotFound),
            (
                WorkflowError::ProfileNotFound { role: Role::Manager, user_id: "u".to_string() },
                ErrorKind::ProfileNotFound,
            ),
            (
                WorkflowError::InvalidTransition {
                    claim_id: "c".to_string(),
                    source: TransitionError::InvalidTransition {
                        state: ClaimStatus::Rejected,
                        event: ClaimEvent::ManagerApproved,
                    },
                },
                ErrorKind::InvalidTransition,
            ),
            (WorkflowError::Conflict { claim_id: "c".to_string() }, ErrorKind::Conflict),
            (WorkflowError::dependency("storage", "disk full"), ErrorKind::DependencyFailure),
        ];

        for (error, kind) in cases {
            assert_eq!(error.kind(), kind);
            assert_eq!(error.into_interface("req-0").kind(), kind);
        }
    }

    #[test]
    fn shared_interface_variants_keep_the_workflow_kind() {
        let invalid_input =
            WorkflowError::from(ValidationFailure::DescriptionMissing).into_interface("req-4");
        let illegal_move = WorkflowError::InvalidTransition {
            claim_id: "CLM-1".to_string(),
            source: TransitionError::InvalidTransition {
                state: ClaimStatus::Rejected,
                event: ClaimEvent::ManagerApproved,
            },
        }
        .into_interface("req-5");
        assert!(matches!(invalid_input, InterfaceError::BadRequest { .. }));
        assert!(matches!(illegal_move, InterfaceError::BadRequest { .. }));
        assert_eq!(invalid_input.kind(), ErrorKind::ValidationFailed);
        assert_eq!(illegal_move.kind(), ErrorKind::InvalidTransition);

        let no_profile = WorkflowError::ProfileNotFound {
            role: Role::Lecturer,
            user_id: "lec-ghost".to_string(),
        }
        .into_interface("req-6");
        let no_claim = WorkflowError::not_found("claim", "999").into_interface("req-7");
        assert!(matches!(no_profile, InterfaceError::NotFound { .. }));
        assert!(matches!(no_claim, InterfaceError::NotFound { .. }));
        assert_eq!(no_profile.kind(), ErrorKind::ProfileNotFound);
        assert_eq!(no_claim.kind(), ErrorKind::NotFound);
        assert_ne!(no_profile.user_message(), no_claim.user_message());
    }

    #[test]
    fn dependency_failure_hides_details_from_user() {
        let interface =
            WorkflowError::dependency("storage", "EACCES /var/uploads").into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
        assert!(!interface.user_message().contains("EACCES"));
    }

    #[test]
    fn forbidden_and_not_found_stay_distinct() {
        let forbidden =
            WorkflowError::Forbidden { user_id: "a".to_string(), claim_id: "1".to_string() }
                .into_interface("req-1");
        let missing = WorkflowError::not_found("claim", "999").into_interface("req-2");

        assert!(matches!(forbidden, InterfaceError::Forbidden { .. }));
        assert!(matches!(missing, InterfaceError::NotFound { .. }));
    }

    #[test]
    fn store_errors_keep_their_kind() {
        let conflict = WorkflowError::from(StoreError::Conflict {
            claim_id: "CLM-1".to_string(),
            expected_version: 2,
        });
        let missing =
            WorkflowError::from(StoreError::Missing { entity: "claim", id: "999".to_string() });
        let down = WorkflowError::from(StoreError::Unavailable("pool timed out".to_string()));

        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(down.kind(), ErrorKind::DependencyFailure);
    }

    #[test]
    fn only_conflict_and_dependency_failures_are_retryable() {
        assert!(WorkflowError::Conflict { claim_id: "c".to_string() }.is_retryable());
        assert!(!WorkflowError::not_found("claim", "1").is_retryable());
    }
}
