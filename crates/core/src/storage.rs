use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not write `{key}`: {source}")]
    Write { key: String, source: std::io::Error },
    #[error("could not read `{path}`: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("no stored object at `{0}`")]
    Missing(String),
}

/// Byte sink for uploaded documents. `put` returns the location later passed to `read`.
#[async_trait]
pub trait StorageSink: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;
    async fn exists(&self, path: &str) -> bool;
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Writes each object as a file directly under `root`.
#[derive(Clone, Debug)]
pub struct LocalDirectorySink {
    root: PathBuf,
}

impl LocalDirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageSink for LocalDirectorySink {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Write { key: key.to_string(), source })?;

        let path = self.root.join(key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Write { key: key.to_string(), source })?;

        Ok(path.to_string_lossy().into_owned())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::Missing(path.to_string()))
            }
            Err(source) => Err(StorageError::Read { path: path.to_string(), source }),
        }
    }
}

#[derive(Default)]
pub struct InMemoryStorageSink {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorageSink {
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn remove(&self, path: &str) -> bool {
        self.objects.write().await.remove(path).is_some()
    }
}

#[async_trait]
impl StorageSink for InMemoryStorageSink {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = format!("memory://{key}");
        self.objects.write().await.insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn exists(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::Missing(path.to_string()))
    }
}
