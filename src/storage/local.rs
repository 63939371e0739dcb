use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// Local file system blob store, used for development and tests
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let full_path = self.full_path(key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageWrite(format!("create dir for {}: {}", key, e)))?;
        }

        let mut file = fs::File::create(&full_path)
            .await
            .map_err(|e| AppError::StorageWrite(format!("create {}: {}", key, e)))?;
        file.write_all(&data)
            .await
            .map_err(|e| AppError::StorageWrite(format!("write {}: {}", key, e)))?;
        file.flush()
            .await
            .map_err(|e| AppError::StorageWrite(format!("flush {}: {}", key, e)))?;

        tracing::debug!("Saved blob to {:?}", full_path);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let full_path = self.full_path(key);

        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("Blob not found: {}", key))
            } else {
                AppError::StorageRead(format!("read {}: {}", key, e))
            }
        })?;

        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key);

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted blob {:?}", full_path);
                Ok(())
            }
            // Already absent counts as deleted
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageDelete(format!("delete {}: {}", key, e))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.full_path(key).exists())
    }

    fn store_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (LocalBlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (store, _dir) = store();

        store
            .put("uploads/1-report.pdf", Bytes::from_static(b"abc"))
            .await
            .unwrap();
        let data = store.get("uploads/1-report.pdf").await.unwrap();
        assert_eq!(&data[..], b"abc");
        assert!(store.exists("uploads/1-report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let (store, _dir) = store();

        store.put("uploads/k", Bytes::from_static(b"v1")).await.unwrap();
        store.put("uploads/k", Bytes::from_static(b"v2")).await.unwrap();
        assert_eq!(&store.get("uploads/k").await.unwrap()[..], b"v2");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (store, _dir) = store();

        let err = store.get("uploads/absent").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_then_get_missing() {
        let (store, _dir) = store();

        store.put("uploads/k", Bytes::from_static(b"x")).await.unwrap();
        store.delete("uploads/k").await.unwrap();
        assert!(!store.exists("uploads/k").await.unwrap());
        assert!(matches!(
            store.get("uploads/k").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_success() {
        let (store, _dir) = store();
        store.delete("uploads/never-existed").await.unwrap();
    }
}
