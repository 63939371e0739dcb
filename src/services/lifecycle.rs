use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::mail::{AttachmentRef, EmailMessage, Mailer};
use crate::models::{FileDownload, FileRecord, NewFileRecord, ShareRequest, UploadRequest};
use crate::repo::FileRepository;
use crate::storage::BlobStore;

/// Orchestrates the file lifecycle across the blob store, the metadata
/// repository, and the mailer.
///
/// The two stores fail independently, so every operation runs its calls in a
/// fixed order chosen so that a record never points at a missing blob and an
/// uploaded blob is never lost silently:
///
/// - upload: blob write first, record second; a record-create failure after a
///   successful write surfaces as `OrphanedBlob` rather than success or a
///   speculative blob delete.
/// - delete: blob delete first, record second; a blob-delete failure leaves
///   the record intact and retrying the delete is the recovery path.
/// - download: the counter is incremented before the fetch, so it tallies
///   attempted downloads and may overcount successful transfers.
/// - share: the counter is incremented only after the mailer reported
///   success.
pub struct FileLifecycle {
    repo: FileRepository,
    store: Arc<dyn BlobStore>,
    mailer: Arc<dyn Mailer>,
    public_url: String,
}

/// Build the blob key for an upload: millisecond timestamp plus the
/// sanitized original name, under the application prefix. Keys are never
/// reused across uploads.
pub fn storage_key(file_name: &str, now: DateTime<Utc>) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("uploads/{}-{}", now.timestamp_millis(), sanitized)
}

impl FileLifecycle {
    pub fn new(
        repo: FileRepository,
        store: Arc<dyn BlobStore>,
        mailer: Arc<dyn Mailer>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            store,
            mailer,
            public_url: public_url.into(),
        }
    }

    /// Upload: validate, write the blob, then create the record.
    ///
    /// No record exists until the blob write succeeded, so a failed write
    /// leaves nothing to clean up on the metadata side. The caller keeps any
    /// temporary copy of the bytes until this returns Ok.
    pub async fn upload(&self, req: UploadRequest) -> Result<FileRecord> {
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        if req.description.trim().is_empty() {
            return Err(AppError::Validation(
                "Description must not be empty".to_string(),
            ));
        }
        if req.bytes.is_empty() {
            return Err(AppError::Validation("File must not be empty".to_string()));
        }

        let key = storage_key(&req.file_name, Utc::now());
        let size = req.bytes.len() as i64;

        self.store.put(&key, req.bytes).await?;

        let record = self
            .repo
            .create(NewFileRecord {
                title: req.title,
                description: req.description,
                storage_key: key.clone(),
                file_name: req.file_name,
                content_type: req.content_type,
                size,
                uploaded_by: req.uploaded_by,
            })
            .await
            .map_err(|e| AppError::OrphanedBlob {
                key,
                reason: e.to_string(),
            })?;

        tracing::info!("Uploaded file {} as blob {}", record.id, record.storage_key);
        Ok(record)
    }

    /// Download: increment the counter, then fetch the blob.
    ///
    /// A blob missing behind a valid record is a storage inconsistency, not
    /// a plain miss; by then the counter is already incremented per the
    /// attempted-downloads policy.
    pub async fn download(&self, id: &str) -> Result<FileDownload> {
        let record = self.find(id).await?;

        self.repo.increment_download_count(id).await?;

        let bytes = match self.store.get(&record.storage_key).await {
            Ok(bytes) => bytes,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::StorageInconsistency {
                    id: record.id,
                    key: record.storage_key,
                });
            }
            Err(e) => return Err(e),
        };

        Ok(FileDownload {
            file_name: record.file_name,
            content_type: record.content_type,
            bytes,
        })
    }

    /// Delete: remove the blob, then the record.
    ///
    /// Metadata is never deleted while the blob might still exist; if the
    /// blob delete fails the record stays and the client retries the delete.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let record = self.find(id).await?;

        self.store.delete(&record.storage_key).await?;
        self.repo.delete(id).await?;

        tracing::info!("Deleted file {} and blob {}", record.id, record.storage_key);
        Ok(())
    }

    /// Share by email: send first, count on success only.
    pub async fn share(&self, id: &str, req: ShareRequest) -> Result<FileRecord> {
        let record = self.find(id).await?;

        if req.recipient_email.trim().is_empty() {
            return Err(AppError::Validation(
                "Recipient email must not be empty".to_string(),
            ));
        }

        let message = EmailMessage {
            to: req.recipient_email,
            subject: req
                .subject
                .unwrap_or_else(|| format!("File shared with you: {}", record.title)),
            body: req.message.unwrap_or_else(|| record.description.clone()),
            attachment: Some(AttachmentRef {
                file_name: record.file_name.clone(),
                url: format!("{}/api/v1/files/{}/download", self.public_url, record.id),
            }),
        };

        self.mailer.send(&message).await?;
        self.repo.increment_emails_sent(id).await?;

        self.find(id).await
    }

    /// List all records; read-through to the repository.
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        self.repo.find_all().await
    }

    /// Find a record by id; a miss is a normal NotFound outcome.
    pub async fn find(&self, id: &str) -> Result<FileRecord> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::mail::mock::MockMailer;
    use crate::storage::LocalBlobStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Blob store wrapper whose put/delete can be made to fail on demand.
    struct FlakyStore {
        inner: LocalBlobStore,
        fail_put: AtomicBool,
        fail_delete: AtomicBool,
    }

    impl FlakyStore {
        fn new(inner: LocalBlobStore) -> Self {
            Self {
                inner,
                fail_put: AtomicBool::new(false),
                fail_delete: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl BlobStore for FlakyStore {
        async fn put(&self, key: &str, data: Bytes) -> crate::error::Result<()> {
            if self.fail_put.load(Ordering::SeqCst) {
                return Err(AppError::StorageWrite("simulated put failure".to_string()));
            }
            self.inner.put(key, data).await
        }

        async fn get(&self, key: &str) -> crate::error::Result<Bytes> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> crate::error::Result<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(AppError::StorageDelete(
                    "simulated delete failure".to_string(),
                ));
            }
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> crate::error::Result<bool> {
            self.inner.exists(key).await
        }

        fn store_type(&self) -> &'static str {
            "flaky"
        }
    }

    struct Harness {
        lifecycle: Arc<FileLifecycle>,
        store: Arc<FlakyStore>,
        mailer: Arc<MockMailer>,
        db: Database,
        _dirs: (TempDir, TempDir),
    }

    async fn harness() -> Harness {
        let db_dir = TempDir::new().unwrap();
        let blob_dir = TempDir::new().unwrap();

        let path = db_dir.path().join("test.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        db.run_migrations().await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, verified) VALUES ('u1', 'u1@example.com', 'U One', 'x', 1)",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let repo = FileRepository::new(db.clone());
        let store = Arc::new(FlakyStore::new(LocalBlobStore::new(blob_dir.path())));
        let mailer = Arc::new(MockMailer::default());
        let lifecycle = Arc::new(FileLifecycle::new(
            repo,
            store.clone(),
            mailer.clone(),
            "http://localhost:1420",
        ));

        Harness {
            lifecycle,
            store,
            mailer,
            db,
            _dirs: (db_dir, blob_dir),
        }
    }

    fn upload_req(bytes: &'static [u8]) -> UploadRequest {
        UploadRequest {
            title: "Report".to_string(),
            description: "Q1".to_string(),
            file_name: "report.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: Bytes::from_static(bytes),
            uploaded_by: "u1".to_string(),
        }
    }

    #[test]
    fn test_storage_key_scheme() {
        let t = Utc.timestamp_millis_opt(1).unwrap();
        assert_eq!(storage_key("report.pdf", t), "uploads/1-report.pdf");
        assert_eq!(storage_key("a b/c.txt", t), "uploads/1-a_b_c.txt");
    }

    #[tokio::test]
    async fn test_upload_round_trip() {
        let h = harness().await;

        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();
        assert_eq!(record.download_count, 0);
        assert_eq!(record.emails_sent, 0);
        assert!(record.storage_key.starts_with("uploads/"));

        let found = h.lifecycle.find(&record.id).await.unwrap();
        let bytes = h.store.get(&found.storage_key).await.unwrap();
        assert_eq!(&bytes[..], b"abc");
    }

    #[tokio::test]
    async fn test_upload_validation_precedes_remote_calls() {
        let h = harness().await;

        let mut req = upload_req(b"abc");
        req.title = "".to_string();
        assert!(matches!(
            h.lifecycle.upload(req).await.unwrap_err(),
            AppError::Validation(_)
        ));

        let mut req = upload_req(b"abc");
        req.description = "  ".to_string();
        assert!(matches!(
            h.lifecycle.upload(req).await.unwrap_err(),
            AppError::Validation(_)
        ));

        assert!(matches!(
            h.lifecycle.upload(upload_req(b"")).await.unwrap_err(),
            AppError::Validation(_)
        ));

        // Nothing reached either store
        assert!(h.lifecycle.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_blob_write_failure_creates_no_record() {
        let h = harness().await;
        h.store.fail_put.store(true, Ordering::SeqCst);

        let err = h.lifecycle.upload(upload_req(b"abc")).await.unwrap_err();
        assert!(matches!(err, AppError::StorageWrite(_)));
        assert!(h.lifecycle.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_metadata_failure_is_orphaned_blob() {
        let h = harness().await;

        // Break record creation after the blob write succeeds
        sqlx::query("DROP TABLE files")
            .execute(h.db.pool())
            .await
            .unwrap();

        let err = h.lifecycle.upload(upload_req(b"abc")).await.unwrap_err();
        let key = match err {
            AppError::OrphanedBlob { key, .. } => key,
            other => panic!("expected OrphanedBlob, got {:?}", other),
        };

        // The blob was written and must not be speculatively deleted
        assert_eq!(&h.store.get(&key).await.unwrap()[..], b"abc");
    }

    #[tokio::test]
    async fn test_download_returns_bytes_and_counts() {
        let h = harness().await;
        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();

        let download = h.lifecycle.download(&record.id).await.unwrap();
        assert_eq!(&download.bytes[..], b"abc");
        assert_eq!(download.file_name, "report.pdf");
        assert_eq!(
            download.content_type.as_deref(),
            Some("application/pdf")
        );

        let found = h.lifecycle.find(&record.id).await.unwrap();
        assert_eq!(found.download_count, 1);
    }

    #[tokio::test]
    async fn test_download_missing_record_is_not_found() {
        let h = harness().await;
        assert!(matches!(
            h.lifecycle.download("nope").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_download_missing_blob_is_storage_inconsistency() {
        let h = harness().await;
        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();

        // Remove the blob behind the record's back
        h.store.delete(&record.storage_key).await.unwrap();

        let err = h.lifecycle.download(&record.id).await.unwrap_err();
        assert!(matches!(err, AppError::StorageInconsistency { .. }));

        // The counter was already incremented per the attempted-downloads policy
        let found = h.lifecycle.find(&record.id).await.unwrap();
        assert_eq!(found.download_count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_downloads_do_not_lose_increments() {
        let h = harness().await;
        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lifecycle = h.lifecycle.clone();
            let id = record.id.clone();
            handles.push(tokio::spawn(async move { lifecycle.download(&id).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let found = h.lifecycle.find(&record.id).await.unwrap();
        assert_eq!(found.download_count, 8);
    }

    #[tokio::test]
    async fn test_delete_removes_blob_then_record() {
        let h = harness().await;
        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();

        h.lifecycle.delete(&record.id).await.unwrap();

        assert!(matches!(
            h.lifecycle.find(&record.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            h.store.get(&record.storage_key).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_blob_failure_keeps_record() {
        let h = harness().await;
        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();

        h.store.fail_delete.store(true, Ordering::SeqCst);
        let err = h.lifecycle.delete(&record.id).await.unwrap_err();
        assert!(matches!(err, AppError::StorageDelete(_)));

        // Record intact; retrying the delete is the recovery path
        assert!(h.lifecycle.find(&record.id).await.is_ok());

        h.store.fail_delete.store(false, Ordering::SeqCst);
        h.lifecycle.delete(&record.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_not_found() {
        let h = harness().await;
        assert!(matches!(
            h.lifecycle.delete("nope").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_share_success_increments_counter() {
        let h = harness().await;
        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();

        let updated = h
            .lifecycle
            .share(
                &record.id,
                ShareRequest {
                    recipient_email: "a@b.com".to_string(),
                    subject: None,
                    message: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.emails_sent, 1);
        assert_eq!(h.mailer.sent_count(), 1);

        let sent = h.mailer.sent.lock().unwrap();
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.file_name, "report.pdf");
        assert_eq!(
            attachment.url,
            format!("http://localhost:1420/api/v1/files/{}/download", record.id)
        );
    }

    #[tokio::test]
    async fn test_share_failure_leaves_counter_unchanged() {
        let h = harness().await;
        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();

        h.mailer.set_fail(true);
        let err = h
            .lifecycle
            .share(
                &record.id,
                ShareRequest {
                    recipient_email: "a@b.com".to_string(),
                    subject: None,
                    message: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Notification(_)));

        let found = h.lifecycle.find(&record.id).await.unwrap();
        assert_eq!(found.emails_sent, 0);
    }

    #[tokio::test]
    async fn test_share_missing_record_is_not_found() {
        let h = harness().await;
        let err = h
            .lifecycle
            .share(
                "nope",
                ShareRequest {
                    recipient_email: "a@b.com".to_string(),
                    subject: None,
                    message: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(h.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_share_empty_recipient_is_validation() {
        let h = harness().await;
        let record = h.lifecycle.upload(upload_req(b"abc")).await.unwrap();

        let err = h
            .lifecycle
            .share(
                &record.id,
                ShareRequest {
                    recipient_email: " ".to_string(),
                    subject: None,
                    message: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.mailer.sent_count(), 0);
    }
}
