//! Object storage for crawl archives and query results.
//!
//! The provider is external; the contract is fetch/put by (bucket, key).
//! The filesystem implementation keeps each bucket as a directory under the
//! configured root, with two-level fan-out avoided since keys are few.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Filesystem-backed object store rooted at a data directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        // Keys may contain slashes (e.g. results/17); treat them as paths.
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_fetch_round_trips() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store
            .put("results.sentimentron.co.uk", "results/17", b"{\"ok\":true}")
            .await
            .unwrap();
        let bytes = store
            .fetch("results.sentimentron.co.uk", "results/17")
            .await
            .unwrap();
        assert_eq!(bytes, b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let err = store.fetch("bucket", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
