use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use claimdesk_core::domain::claim::ClaimId;
use claimdesk_core::domain::document::{Document, DocumentId};
use claimdesk_core::ports::{DocumentStore, StoreError};

use super::{column, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlDocumentStore {
    pool: DbPool,
}

impl SqlDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, document: &Document) -> Result<(), RepositoryError> {
        let size_bytes = i64::try_from(document.size_bytes)
            .map_err(|_| RepositoryError::Decode("document size out of range".to_string()))?;

        sqlx::query(
            "INSERT INTO claim_document (id, claim_id, file_name, storage_path, content_type,
                                         size_bytes, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&document.id.0)
        .bind(&document.claim_id.0)
        .bind(&document.file_name)
        .bind(&document.storage_path)
        .bind(&document.content_type)
        .bind(size_bytes)
        .bind(timestamp(&document.uploaded_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, claim_id, file_name, storage_path, content_type, size_bytes, uploaded_at
             FROM claim_document WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn for_claim(&self, claim_id: &ClaimId) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, claim_id, file_name, storage_path, content_type, size_bytes, uploaded_at
             FROM claim_document WHERE claim_id = ? ORDER BY uploaded_at ASC, file_name ASC",
        )
        .bind(&claim_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn insert_document(&self, document: Document) -> Result<(), StoreError> {
        Ok(self.insert(&document).await?)
    }

    async fn find_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.load(id).await?)
    }

    async fn list_documents_for_claim(
        &self,
        claim_id: &ClaimId,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self.for_claim(claim_id).await?)
    }
}

fn row_to_document(row: &SqliteRow) -> Result<Document, RepositoryError> {
    let size_bytes: i64 = column(row, "size_bytes")?;

    Ok(Document {
        id: DocumentId(column(row, "id")?),
        claim_id: ClaimId(column(row, "claim_id")?),
        file_name: column(row, "file_name")?,
        storage_path: column(row, "storage_path")?,
        content_type: column(row, "content_type")?,
        size_bytes: u64::try_from(size_bytes)
            .map_err(|_| RepositoryError::Decode(format!("negative size {size_bytes}")))?,
        uploaded_at: parse_timestamp(&column::<String>(row, "uploaded_at")?)?,
    })
}
