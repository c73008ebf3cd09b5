//! Stores uploaded files for a claim and records their metadata.
//!
//! Attachment is best-effort: a file that is empty or too large, or whose bytes or metadata
//! could not be saved, is reported as skipped and never fails the submission that carried it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_DOCUMENT_BYTES;
use crate::domain::claim::ClaimId;
use crate::domain::document::{Document, DocumentId};
use crate::ports::DocumentStore;
use crate::storage::StorageSink;

const FALLBACK_FILE_NAME: &str = "upload";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self { file_name: file_name.into(), content_type: content_type.into(), bytes: bytes.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Empty,
    TooLarge { size_bytes: u64, max_bytes: u64 },
    StorageFailed { message: String },
    MetadataFailed { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUpload {
    pub file_name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentReport {
    pub attached: Vec<Document>,
    pub skipped: Vec<SkippedUpload>,
}

#[derive(Clone)]
pub struct DocumentAttachmentManager {
    storage: Arc<dyn StorageSink>,
    documents: Arc<dyn DocumentStore>,
    max_bytes: u64,
}

impl DocumentAttachmentManager {
    pub fn new(storage: Arc<dyn StorageSink>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { storage, documents, max_bytes: DEFAULT_MAX_DOCUMENT_BYTES }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Stores each upload and records a `Document` for it. Every failure lands in `skipped`.
    pub async fn attach(
        &self,
        claim_id: &ClaimId,
        uploads: &[Upload],
        now: DateTime<Utc>,
    ) -> AttachmentReport {
        let mut report = AttachmentReport::default();

        for upload in uploads {
            let size_bytes = upload.bytes.len() as u64;
            if size_bytes == 0 {
                report.skipped.push(skip(upload, SkipReason::Empty));
                continue;
            }
            if size_bytes > self.max_bytes {
                report.skipped.push(skip(
                    upload,
                    SkipReason::TooLarge { size_bytes, max_bytes: self.max_bytes },
                ));
                continue;
            }

            let file_name = sanitize_file_name(&upload.file_name);
            let key = format!("{}_{}", Uuid::new_v4().simple(), file_name);
            let storage_path = match self.storage.put(&key, &upload.bytes).await {
                Ok(path) => path,
                Err(error) => {
                    tracing::error!(
                        event_name = "attachment.storage_failed",
                        claim_id = %claim_id,
                        file_name = %file_name,
                        error = %error,
                        "could not store uploaded document"
                    );
                    report.skipped.push(skip(
                        upload,
                        SkipReason::StorageFailed { message: error.to_string() },
                    ));
                    continue;
                }
            };

            let document = Document {
                id: DocumentId::generate(),
                claim_id: claim_id.clone(),
                file_name,
                storage_path,
                content_type: upload.content_type.clone(),
                size_bytes,
                uploaded_at: now,
            };
            // Stored bytes without a metadata row stay orphaned in the sink.
            if let Err(error) = self.documents.insert_document(document.clone()).await {
                tracing::error!(
                    event_name = "attachment.metadata_failed",
                    claim_id = %claim_id,
                    file_name = %document.file_name,
                    storage_path = %document.storage_path,
                    error = %error,
                    "could not record uploaded document"
                );
                report.skipped.push(skip(
                    upload,
                    SkipReason::MetadataFailed { message: error.to_string() },
                ));
                continue;
            }
            report.attached.push(document);
        }

        report
    }
}

fn skip(upload: &Upload, reason: SkipReason) -> SkippedUpload {
    SkippedUpload { file_name: upload.file_name.clone(), reason }
}

/// Keeps only the final path component of a client-supplied name.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        FALLBACK_FILE_NAME.to_string()
    } else {
        base.to_string()
    }
}
