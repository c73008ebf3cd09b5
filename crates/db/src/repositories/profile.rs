use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use claimdesk_core::domain::profile::{
    Coordinator, CoordinatorId, Lecturer, LecturerId, Manager, ManagerId, UserId,
};
use claimdesk_core::ports::{ProfileStore, StoreError};

use super::{column, parse_decimal, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const LECTURER_COLUMNS: &str =
    "id, user_id, first_name, last_name, email, department, hourly_rate, active, created_at";
const STAFF_COLUMNS: &str =
    "id, user_id, first_name, last_name, email, department, active, created_at";

/// Reviewer tables share one shape.
#[derive(Clone, Copy)]
enum StaffTable {
    Coordinator,
    Manager,
}

impl StaffTable {
    fn name(self) -> &'static str {
        match self {
            Self::Coordinator => "coordinator",
            Self::Manager => "manager",
        }
    }
}

struct StaffRow {
    id: String,
    user_id: UserId,
    first_name: String,
    last_name: String,
    email: String,
    department: String,
    active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

pub struct SqlProfileStore {
    pool: DbPool,
}

impl SqlProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn lecturer_where(
        &self,
        column_name: &str,
        value: &str,
    ) -> Result<Option<Lecturer>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {LECTURER_COLUMNS} FROM lecturer WHERE {column_name} = ?"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_lecturer).transpose()
    }

    async fn staff_by_user(
        &self,
        table: StaffTable,
        user_id: &UserId,
    ) -> Result<Option<StaffRow>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM {} WHERE user_id = ?",
            table.name()
        ))
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_staff).transpose()
    }

    async fn upsert_lecturer(&self, lecturer: &Lecturer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lecturer (id, user_id, first_name, last_name, email, department,
                                   hourly_rate, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 email = excluded.email,
                 department = excluded.department,
                 hourly_rate = excluded.hourly_rate,
                 active = excluded.active",
        )
        .bind(&lecturer.id.0)
        .bind(&lecturer.user_id.0)
        .bind(&lecturer.first_name)
        .bind(&lecturer.last_name)
        .bind(&lecturer.email)
        .bind(&lecturer.department)
        .bind(lecturer.hourly_rate.to_string())
        .bind(lecturer.active)
        .bind(timestamp(&lecturer.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_staff(
        &self,
        table: StaffTable,
        staff: StaffRow,
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO {} ({STAFF_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 email = excluded.email,
                 department = excluded.department,
                 active = excluded.active",
            table.name()
        ))
        .bind(&staff.id)
        .bind(&staff.user_id.0)
        .bind(&staff.first_name)
        .bind(&staff.last_name)
        .bind(&staff.email)
        .bind(&staff.department)
        .bind(staff.active)
        .bind(timestamp(&staff.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqlProfileStore {
    async fn find_lecturer(&self, id: &LecturerId) -> Result<Option<Lecturer>, StoreError> {
        Ok(self.lecturer_where("id", &id.0).await?)
    }

    async fn find_lecturer_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Lecturer>, StoreError> {
        Ok(self.lecturer_where("user_id", &user_id.0).await?)
    }

    async fn find_coordinator_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Coordinator>, StoreError> {
        let staff = self.staff_by_user(StaffTable::Coordinator, user_id).await?;
        Ok(staff.map(|staff| Coordinator {
            id: CoordinatorId(staff.id),
            user_id: staff.user_id,
            first_name: staff.first_name,
            last_name: staff.last_name,
            email: staff.email,
            department: staff.department,
            active: staff.active,
            created_at: staff.created_at,
        }))
    }

    async fn find_manager_by_user(&self, user_id: &UserId) -> Result<Option<Manager>, StoreError> {
        let staff = self.staff_by_user(StaffTable::Manager, user_id).await?;
        Ok(staff.map(|staff| Manager {
            id: ManagerId(staff.id),
            user_id: staff.user_id,
            first_name: staff.first_name,
            last_name: staff.last_name,
            email: staff.email,
            department: staff.department,
            active: staff.active,
            created_at: staff.created_at,
        }))
    }

    async fn save_lecturer(&self, lecturer: Lecturer) -> Result<(), StoreError> {
        Ok(self.upsert_lecturer(&lecturer).await?)
    }

    async fn save_coordinator(&self, coordinator: Coordinator) -> Result<(), StoreError> {
        let staff = StaffRow {
            id: coordinator.id.0,
            user_id: coordinator.user_id,
            first_name: coordinator.first_name,
            last_name: coordinator.last_name,
            email: coordinator.email,
            department: coordinator.department,
            active: coordinator.active,
            created_at: coordinator.created_at,
        };
        Ok(self.upsert_staff(StaffTable::Coordinator, staff).await?)
    }

    async fn save_manager(&self, manager: Manager) -> Result<(), StoreError> {
        let staff = StaffRow {
            id: manager.id.0,
            user_id: manager.user_id,
            first_name: manager.first_name,
            last_name: manager.last_name,
            email: manager.email,
            department: manager.department,
            active: manager.active,
            created_at: manager.created_at,
        };
        Ok(self.upsert_staff(StaffTable::Manager, staff).await?)
    }
}

fn row_to_lecturer(row: &SqliteRow) -> Result<Lecturer, RepositoryError> {
    Ok(Lecturer {
        id: LecturerId(column(row, "id")?),
        user_id: UserId(column(row, "user_id")?),
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        email: column(row, "email")?,
        department: column(row, "department")?,
        hourly_rate: parse_decimal(&column::<String>(row, "hourly_rate")?)?,
        active: column(row, "active")?,
        created_at: parse_timestamp(&column::<String>(row, "created_at")?)?,
    })
}

fn row_to_staff(row: &SqliteRow) -> Result<StaffRow, RepositoryError> {
    Ok(StaffRow {
        id: column(row, "id")?,
        user_id: UserId(column(row, "user_id")?),
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        email: column(row, "email")?,
        department: column(row, "department")?,
        active: column(row, "active")?,
        created_at: parse_timestamp(&column::<String>(row, "created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use claimdesk_core::domain::profile::{Lecturer, LecturerId, Manager, ManagerId, UserId};
    use claimdesk_core::ports::ProfileStore;

    use super::SqlProfileStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlProfileStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        SqlProfileStore::new(pool)
    }

    #[tokio::test]
    async fn lecturer_rate_round_trips_as_exact_decimal() {
        let store = store().await;
        let lecturer = Lecturer {
            id: LecturerId("LEC-9".to_string()),
            user_id: UserId("lec-9".to_string()),
            first_name: "Ayanda".to_string(),
            last_name: "Zulu".to_string(),
            email: "ayanda@example.edu".to_string(),
            department: "Statistics".to_string(),
            hourly_rate: Decimal::new(31_250, 2),
            active: true,
            created_at: Utc::now(),
        };
        store.save_lecturer(lecturer.clone()).await.expect("save");

        let by_user = store
            .find_lecturer_by_user(&UserId("lec-9".to_string()))
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(by_user.hourly_rate, Decimal::new(31_250, 2));
        assert_eq!(by_user.id, lecturer.id);

        let mut updated = by_user.clone();
        updated.active = false;
        store.save_lecturer(updated).await.expect("upsert");
        let reloaded = store.find_lecturer(&lecturer.id).await.expect("lookup").expect("present");
        assert!(!reloaded.active);
    }

    #[tokio::test]
    async fn reviewer_profiles_are_found_by_user() {
        let store = store().await;
        store
            .save_manager(Manager {
                id: ManagerId("AM-3".to_string()),
                user_id: UserId("am-3".to_string()),
                first_name: "Kagiso".to_string(),
                last_name: "Molefe".to_string(),
                email: "kagiso@example.edu".to_string(),
                department: "Engineering".to_string(),
                active: true,
                created_at: Utc::now(),
            })
            .await
            .expect("save manager");

        let found = store.find_manager_by_user(&UserId("am-3".to_string())).await.expect("lookup");
        assert_eq!(found.map(|m| m.id.0), Some("AM-3".to_string()));
        assert!(store
            .find_coordinator_by_user(&UserId("am-3".to_string()))
            .await
            .expect("lookup")
            .is_none());
    }
}
