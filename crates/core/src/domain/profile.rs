use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an authenticated user, as issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LecturerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinatorId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagerId(pub String);

macro_rules! string_id {
    ($($id:ty),+) => {
        $(
            impl AsRef<str> for $id {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )+
    };
}

string_id!(UserId, LecturerId, CoordinatorId, ManagerId);

impl LecturerId {
    pub fn generate() -> Self {
        Self(format!("LEC-{}", Uuid::new_v4().simple()))
    }
}

impl CoordinatorId {
    pub fn generate() -> Self {
        Self(format!("PC-{}", Uuid::new_v4().simple()))
    }
}

impl ManagerId {
    pub fn generate() -> Self {
        Self(format!("AM-{}", Uuid::new_v4().simple()))
    }
}

/// Lecturer profile. `hourly_rate` is set by HR and is the only source for a claim's rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lecturer {
    pub id: LecturerId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub hourly_rate: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinator {
    pub id: CoordinatorId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub id: ManagerId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Lecturer {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

impl Coordinator {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

impl Manager {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

fn join_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{Lecturer, LecturerId, UserId};

    #[test]
    fn full_name_tolerates_missing_last_name() {
        let lecturer = Lecturer {
            id: LecturerId::generate(),
            user_id: UserId("u-1".to_string()),
            first_name: "Thandi".to_string(),
            last_name: String::new(),
            email: "thandi@example.edu".to_string(),
            department: "Mathematics".to_string(),
            hourly_rate: Decimal::new(25_000, 2),
            active: true,
            created_at: Utc::now(),
        };

        assert_eq!(lecturer.full_name(), "Thandi");
    }

    #[test]
    fn generated_ids_carry_role_prefix() {
        assert!(LecturerId::generate().0.starts_with("LEC-"));
    }
}
