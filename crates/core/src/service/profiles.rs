use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ClaimService;
use crate::audit::{AuditCategory, AuditOutcome};
use crate::auth::{Action, RequestContext, Role};
use crate::domain::profile::{
    Coordinator, CoordinatorId, Lecturer, LecturerId, Manager, ManagerId, UserId,
};
use crate::errors::{ValidationFailure, WorkflowError};

const EVENT_PROFILE: &str = "profile.updated";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Lecturer,
    Coordinator,
    Manager,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lecturer => "lecturer",
            Self::Coordinator => "coordinator",
            Self::Manager => "manager",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match Role::parse(value)? {
            Role::Lecturer => Some(Self::Lecturer),
            Role::Coordinator => Some(Self::Coordinator),
            Role::Manager => Some(Self::Manager),
            Role::Hr | Role::Admin => None,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Lecturer => Role::Lecturer,
            Self::Coordinator => Role::Coordinator,
            Self::Manager => Role::Manager,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub kind: ProfileKind,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    /// Required for lecturers, ignored otherwise.
    pub hourly_rate: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegisteredProfile {
    Lecturer(Lecturer),
    Coordinator(Coordinator),
    Manager(Manager),
}

impl RegisteredProfile {
    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::Lecturer(_) => ProfileKind::Lecturer,
            Self::Coordinator(_) => ProfileKind::Coordinator,
            Self::Manager(_) => ProfileKind::Manager,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Lecturer(profile) => &profile.id.0,
            Self::Coordinator(profile) => &profile.id.0,
            Self::Manager(profile) => &profile.id.0,
        }
    }

    pub fn active(&self) -> bool {
        match self {
            Self::Lecturer(profile) => profile.active,
            Self::Coordinator(profile) => profile.active,
            Self::Manager(profile) => profile.active,
        }
    }
}

impl ClaimService {
    /// Creates the role profile that links a user to claims or reviews. A user holds at most one
    /// profile of each kind.
    pub async fn register_profile(
        &self,
        ctx: &RequestContext,
        new: NewProfile,
    ) -> Result<RegisteredProfile, WorkflowError> {
        let attempt = async {
            ctx.subject.authorize(Action::AdministerProfiles)?;
            validate_profile(&new)?;
            let user_id = UserId(new.user_id.trim().to_string());
            if self.find_profile(new.kind, &user_id).await?.is_some() {
                return Err(WorkflowError::ValidationFailed(ValidationFailure::Malformed(
                    format!("user `{}` already has a {} profile", user_id.0, new.kind.as_str()),
                )));
            }

            let now = Utc::now();
            let profile = match new.kind {
                ProfileKind::Lecturer => {
                    let rate = new.hourly_rate.ok_or_else(|| {
                        WorkflowError::ValidationFailed(ValidationFailure::Malformed(
                            "lecturer profiles need an hourly rate".to_string(),
                        ))
                    })?;
                    self.check_rate(rate)?;
                    let lecturer = Lecturer {
                        id: LecturerId::generate(),
                        user_id,
                        first_name: new.first_name.trim().to_string(),
                        last_name: new.last_name.trim().to_string(),
                        email: new.email.trim().to_string(),
                        department: new.department.trim().to_string(),
                        hourly_rate: rate,
                        active: true,
                        created_at: now,
                    };
                    self.profiles.save_lecturer(lecturer.clone()).await?;
                    RegisteredProfile::Lecturer(lecturer)
                }
                ProfileKind::Coordinator => {
                    let coordinator = Coordinator {
                        id: CoordinatorId::generate(),
                        user_id,
                        first_name: new.first_name.trim().to_string(),
                        last_name: new.last_name.trim().to_string(),
                        email: new.email.trim().to_string(),
                        department: new.department.trim().to_string(),
                        active: true,
                        created_at: now,
                    };
                    self.profiles.save_coordinator(coordinator.clone()).await?;
                    RegisteredProfile::Coordinator(coordinator)
                }
                ProfileKind::Manager => {
                    let manager = Manager {
                        id: ManagerId::generate(),
                        user_id,
                        first_name: new.first_name.trim().to_string(),
                        last_name: new.last_name.trim().to_string(),
                        email: new.email.trim().to_string(),
                        department: new.department.trim().to_string(),
                        active: true,
                        created_at: now,
                    };
                    self.profiles.save_manager(manager.clone()).await?;
                    RegisteredProfile::Manager(manager)
                }
            };
            Ok(profile)
        };

        let profile = attempt.await.map_err(|error| {
            self.refuse(ctx, None, EVENT_PROFILE, AuditCategory::Administration, error)
        })?;

        tracing::info!(
            event_name = "profile.registered",
            correlation_id = %ctx.correlation_id,
            profile_id = profile.id(),
            kind = profile.kind().as_str(),
            "profile registered"
        );
        self.record(
            ctx,
            None,
            "profile.registered",
            AuditCategory::Administration,
            AuditOutcome::Success,
            &[("profile_id", profile.id().to_string())],
        );
        Ok(profile)
    }

    /// Changes the rate used for the lecturer's future claims. Existing claims keep the rate
    /// they were created with.
    pub async fn set_lecturer_rate(
        &self,
        ctx: &RequestContext,
        lecturer_id: &LecturerId,
        hourly_rate: Decimal,
    ) -> Result<Lecturer, WorkflowError> {
        let attempt = async {
            ctx.subject.authorize(Action::AdministerProfiles)?;
            self.check_rate(hourly_rate)?;
            let mut lecturer = self
                .profiles
                .find_lecturer(lecturer_id)
                .await?
                .ok_or_else(|| WorkflowError::not_found("lecturer", lecturer_id.0.clone()))?;
            let previous = lecturer.hourly_rate;
            lecturer.hourly_rate = hourly_rate;
            self.profiles.save_lecturer(lecturer.clone()).await?;
            Ok::<_, WorkflowError>((lecturer, previous))
        };

        let (lecturer, previous) = attempt.await.map_err(|error| {
            self.refuse(ctx, None, EVENT_PROFILE, AuditCategory::Administration, error)
        })?;

        tracing::info!(
            event_name = "profile.rate_changed",
            correlation_id = %ctx.correlation_id,
            lecturer_id = %lecturer.id.0,
            previous = %previous,
            current = %lecturer.hourly_rate,
            "lecturer rate changed"
        );
        self.record(
            ctx,
            None,
            "profile.rate_changed",
            AuditCategory::Administration,
            AuditOutcome::Success,
            &[
                ("lecturer_id", lecturer.id.0.clone()),
                ("previous", previous.to_string()),
                ("current", lecturer.hourly_rate.to_string()),
            ],
        );
        Ok(lecturer)
    }

    /// Deactivated profiles stay on record but can no longer submit or review.
    pub async fn set_profile_active(
        &self,
        ctx: &RequestContext,
        kind: ProfileKind,
        user_id: &UserId,
        active: bool,
    ) -> Result<RegisteredProfile, WorkflowError> {
        let attempt = async {
            ctx.subject.authorize(Action::AdministerProfiles)?;
            let profile = self
                .find_profile(kind, user_id)
                .await?
                .ok_or_else(|| WorkflowError::not_found("profile", user_id.0.clone()))?;
            let profile = match profile {
                RegisteredProfile::Lecturer(mut lecturer) => {
                    lecturer.active = active;
                    self.profiles.save_lecturer(lecturer.clone()).await?;
                    RegisteredProfile::Lecturer(lecturer)
                }
                RegisteredProfile::Coordinator(mut coordinator) => {
                    coordinator.active = active;
                    self.profiles.save_coordinator(coordinator.clone()).await?;
                    RegisteredProfile::Coordinator(coordinator)
                }
                RegisteredProfile::Manager(mut manager) => {
                    manager.active = active;
                    self.profiles.save_manager(manager.clone()).await?;
                    RegisteredProfile::Manager(manager)
                }
            };
            Ok::<_, WorkflowError>(profile)
        };

        let profile = attempt.await.map_err(|error| {
            self.refuse(ctx, None, EVENT_PROFILE, AuditCategory::Administration, error)
        })?;

        tracing::info!(
            event_name = "profile.activation_changed",
            correlation_id = %ctx.correlation_id,
            profile_id = profile.id(),
            active,
            "profile activation changed"
        );
        self.record(
            ctx,
            None,
            "profile.activation_changed",
            AuditCategory::Administration,
            AuditOutcome::Success,
            &[("profile_id", profile.id().to_string()), ("active", active.to_string())],
        );
        Ok(profile)
    }

    async fn find_profile(
        &self,
        kind: ProfileKind,
        user_id: &UserId,
    ) -> Result<Option<RegisteredProfile>, WorkflowError> {
        let profile = match kind {
            ProfileKind::Lecturer => self
                .profiles
                .find_lecturer_by_user(user_id)
                .await?
                .map(RegisteredProfile::Lecturer),
            ProfileKind::Coordinator => self
                .profiles
                .find_coordinator_by_user(user_id)
                .await?
                .map(RegisteredProfile::Coordinator),
            ProfileKind::Manager => self
                .profiles
                .find_manager_by_user(user_id)
                .await?
                .map(RegisteredProfile::Manager),
        };
        Ok(profile)
    }

    fn check_rate(&self, rate: Decimal) -> Result<(), WorkflowError> {
        if rate < Decimal::ZERO || rate > self.policy.max_hourly_rate {
            return Err(WorkflowError::ValidationFailed(ValidationFailure::RateOutOfRange {
                rate,
                max: self.policy.max_hourly_rate,
            }));
        }
        Ok(())
    }
}

fn validate_profile(new: &NewProfile) -> Result<(), ValidationFailure> {
    let required = [
        ("user id", &new.user_id),
        ("first name", &new.first_name),
        ("email", &new.email),
        ("department", &new.department),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ValidationFailure::Malformed(format!("{field} is required")));
    }
    if !new.email.contains('@') {
        return Err(ValidationFailure::Malformed(format!(
            "`{}` is not an email address",
            new.email.trim()
        )));
    }
    Ok(())
}
