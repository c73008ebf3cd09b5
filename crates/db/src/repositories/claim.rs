use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};

use claimdesk_core::domain::claim::{Claim, ClaimId, ClaimStatus, PaymentStatus, Stamp};
use claimdesk_core::domain::profile::{CoordinatorId, LecturerId, ManagerId, UserId};
use claimdesk_core::ports::{ClaimFilter, ClaimOrder, ClaimStore, StoreError};

use super::{
    column, date, parse_date, parse_decimal, parse_timestamp, timestamp, RepositoryError,
};
use crate::DbPool;

const CLAIM_COLUMNS: &str = "id, lecturer_id, claim_date, hours_worked, hourly_rate, description,
    department, status, coordinator_id, coordinator_approved_at, coordinator_notes, manager_id,
    manager_approved_at, manager_notes, payment_status, paid_by, paid_at, version, created_at";

pub struct SqlClaimStore {
    pool: DbPool,
}

impl SqlClaimStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, id: &ClaimId) -> Result<Option<Claim>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CLAIM_COLUMNS} FROM claim WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_claim).transpose()
    }

    async fn select_period(
        &self,
        lecturer_id: &LecturerId,
        month_start: NaiveDate,
        month_end: NaiveDate,
    ) -> Result<Vec<Claim>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claim
             WHERE lecturer_id = ? AND claim_date BETWEEN ? AND ?
             ORDER BY claim_date ASC"
        ))
        .bind(&lecturer_id.0)
        .bind(date(month_start))
        .bind(date(month_end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_claim).collect()
    }

    async fn select(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, RepositoryError> {
        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {CLAIM_COLUMNS} FROM claim WHERE 1 = 1"));

        if let Some(lecturer_id) = &filter.lecturer_id {
            query.push(" AND lecturer_id = ").push_bind(lecturer_id.0.clone());
        }
        if !filter.statuses.is_empty() {
            query.push(" AND status IN (");
            let mut statuses = query.separated(", ");
            for status in &filter.statuses {
                statuses.push_bind(status.as_str());
            }
            statuses.push_unseparated(")");
        }
        if let Some(payment_status) = filter.payment_status {
            query.push(" AND payment_status = ").push_bind(payment_status.as_str());
        }
        if let Some(coordinator_id) = &filter.approved_by_coordinator {
            query.push(" AND coordinator_id = ").push_bind(coordinator_id.0.clone());
        }
        if let Some(manager_id) = &filter.approved_by_manager {
            query.push(" AND manager_id = ").push_bind(manager_id.0.clone());
        }

        query.push(" ORDER BY ").push(order_clause(filter.order));
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_claim).collect()
    }

    async fn insert(&self, claim: &Claim) -> Result<(), RepositoryError> {
        let (coordinator_id, coordinator_at) = stamp_columns(&claim.coordinator_approval);
        let (manager_id, manager_at) = stamp_columns(&claim.manager_approval);
        let (paid_by, paid_at) = stamp_columns(&claim.payment);

        sqlx::query(
            "INSERT INTO claim (id, lecturer_id, claim_date, hours_worked, hourly_rate, description,
                                department, status, coordinator_id, coordinator_approved_at,
                                coordinator_notes, manager_id, manager_approved_at, manager_notes,
                                payment_status, paid_by, paid_at, version, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&claim.id.0)
        .bind(&claim.lecturer_id.0)
        .bind(date(claim.claim_date))
        .bind(claim.hours_worked.to_string())
        .bind(claim.hourly_rate.to_string())
        .bind(&claim.description)
        .bind(&claim.department)
        .bind(claim.status.as_str())
        .bind(coordinator_id)
        .bind(coordinator_at)
        .bind(&claim.coordinator_notes)
        .bind(manager_id)
        .bind(manager_at)
        .bind(&claim.manager_notes)
        .bind(claim.payment_status.as_str())
        .bind(paid_by)
        .bind(paid_at)
        .bind(i64::from(claim.version))
        .bind(timestamp(&claim.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Compare-and-swap on `version`. Returns the number of rows written.
    async fn write_workflow_fields(&self, claim: &Claim) -> Result<u64, RepositoryError> {
        let (coordinator_id, coordinator_at) = stamp_columns(&claim.coordinator_approval);
        let (manager_id, manager_at) = stamp_columns(&claim.manager_approval);
        let (paid_by, paid_at) = stamp_columns(&claim.payment);

        let result = sqlx::query(
            "UPDATE claim SET
                 status = ?,
                 coordinator_id = ?,
                 coordinator_approved_at = ?,
                 coordinator_notes = ?,
                 manager_id = ?,
                 manager_approved_at = ?,
                 manager_notes = ?,
                 payment_status = ?,
                 paid_by = ?,
                 paid_at = ?,
                 version = version + 1
             WHERE id = ? AND version = ?",
        )
        .bind(claim.status.as_str())
        .bind(coordinator_id)
        .bind(coordinator_at)
        .bind(&claim.coordinator_notes)
        .bind(manager_id)
        .bind(manager_at)
        .bind(&claim.manager_notes)
        .bind(claim.payment_status.as_str())
        .bind(paid_by)
        .bind(paid_at)
        .bind(&claim.id.0)
        .bind(i64::from(claim.version))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn exists(&self, id: &ClaimId) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM claim WHERE id = ?)")
            .bind(&id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists == 1)
    }
}

#[async_trait]
impl ClaimStore for SqlClaimStore {
    async fn find_claim(&self, id: &ClaimId) -> Result<Option<Claim>, StoreError> {
        Ok(self.load(id).await?)
    }

    async fn find_claims_by_lecturer_and_period(
        &self,
        lecturer_id: &LecturerId,
        month_start: NaiveDate,
        month_end: NaiveDate,
    ) -> Result<Vec<Claim>, StoreError> {
        Ok(self.select_period(lecturer_id, month_start, month_end).await?)
    }

    async fn list_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, StoreError> {
        Ok(self.select(filter).await?)
    }

    async fn insert_claim(&self, claim: Claim) -> Result<Claim, StoreError> {
        self.insert(&claim).await?;
        Ok(claim)
    }

    async fn update_claim(&self, mut claim: Claim) -> Result<Claim, StoreError> {
        if self.write_workflow_fields(&claim).await? == 1 {
            claim.version += 1;
            return Ok(claim);
        }

        if self.exists(&claim.id).await? {
            tracing::warn!(
                event_name = "claim.update_conflict",
                claim_id = %claim.id,
                expected_version = claim.version,
                "stale claim version"
            );
            return Err(StoreError::Conflict {
                claim_id: claim.id.0.clone(),
                expected_version: claim.version,
            });
        }

        Err(StoreError::Missing { entity: "claim", id: claim.id.0 })
    }
}

fn order_clause(order: ClaimOrder) -> &'static str {
    match order {
        ClaimOrder::NewestFirst => "created_at DESC, claim_date DESC",
        ClaimOrder::OldestFirst => "created_at ASC, claim_date ASC",
        ClaimOrder::CoordinatorApprovalAsc => "coordinator_approved_at ASC",
        ClaimOrder::ManagerApprovalDesc => "manager_approved_at DESC",
        ClaimOrder::PaymentDesc => "paid_at DESC",
    }
}

fn stamp_columns<Id: AsRef<str>>(stamp: &Option<Stamp<Id>>) -> (Option<String>, Option<String>) {
    match stamp {
        Some(stamp) => (Some(stamp.actor_id.as_ref().to_string()), Some(timestamp(&stamp.at))),
        None => (None, None),
    }
}

fn stamp_from_columns<Id>(
    actor: Option<String>,
    at: Option<String>,
    wrap: fn(String) -> Id,
) -> Result<Option<Stamp<Id>>, RepositoryError> {
    match (actor, at) {
        (Some(actor), Some(at)) => Ok(Some(Stamp::new(wrap(actor), parse_timestamp(&at)?))),
        (None, None) => Ok(None),
        (actor, _) => Err(RepositoryError::Decode(format!(
            "approval stamp for `{}` is missing its actor or time",
            actor.unwrap_or_default()
        ))),
    }
}

fn row_to_claim(row: &SqliteRow) -> Result<Claim, RepositoryError> {
    let status: String = column(row, "status")?;
    let payment_status: String = column(row, "payment_status")?;
    let version: i64 = column(row, "version")?;

    Ok(Claim {
        id: ClaimId(column(row, "id")?),
        lecturer_id: LecturerId(column(row, "lecturer_id")?),
        claim_date: parse_date(&column::<String>(row, "claim_date")?)?,
        hours_worked: parse_decimal(&column::<String>(row, "hours_worked")?)?,
        hourly_rate: parse_decimal(&column::<String>(row, "hourly_rate")?)?,
        description: column(row, "description")?,
        department: column(row, "department")?,
        status: ClaimStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown claim status `{status}`")))?,
        coordinator_approval: stamp_from_columns(
            column(row, "coordinator_id")?,
            column(row, "coordinator_approved_at")?,
            CoordinatorId,
        )?,
        coordinator_notes: column(row, "coordinator_notes")?,
        manager_approval: stamp_from_columns(
            column(row, "manager_id")?,
            column(row, "manager_approved_at")?,
            ManagerId,
        )?,
        manager_notes: column(row, "manager_notes")?,
        payment_status: PaymentStatus::parse(&payment_status).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown payment status `{payment_status}`"))
        })?,
        payment: stamp_from_columns(column(row, "paid_by")?, column(row, "paid_at")?, UserId)?,
        version: u32::try_from(version)
            .map_err(|_| RepositoryError::Decode(format!("claim version {version} out of range")))?,
        created_at: parse_timestamp(&column::<String>(row, "created_at")?)?,
    })
}
