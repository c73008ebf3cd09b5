use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use thiserror::Error;

use claimdesk_core::ports::StoreError;
use claimdesk_core::service::Stores;

use crate::DbPool;

pub mod claim;
pub mod document;
pub mod memory;
pub mod profile;

pub use claim::SqlClaimStore;
pub use document::SqlDocumentStore;
pub use memory::{InMemoryClaimStore, InMemoryDocumentStore, InMemoryProfileStore};
pub use profile::SqlProfileStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        tracing::error!(event_name = "store.failure", error = %error, "repository call failed");
        StoreError::Unavailable(error.to_string())
    }
}

/// Store ports backed by the SQLite pool.
pub fn sql_stores(pool: DbPool) -> Stores {
    Stores {
        claims: Arc::new(SqlClaimStore::new(pool.clone())),
        documents: Arc::new(SqlDocumentStore::new(pool.clone())),
        profiles: Arc::new(SqlProfileStore::new(pool)),
    }
}

/// Process-local store ports; nothing survives the process.
pub fn in_memory_stores() -> Stores {
    Stores {
        claims: Arc::new(InMemoryClaimStore::default()),
        documents: Arc::new(InMemoryDocumentStore::default()),
        profiles: Arc::new(InMemoryProfileStore::default()),
    }
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("timestamp `{value}`: {e}")))
}

pub(crate) fn date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("date `{value}`: {e}")))
}

pub(crate) fn parse_decimal(value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|e| RepositoryError::Decode(format!("decimal `{value}`: {e}")))
}
