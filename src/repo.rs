use chrono::Utc;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{FileRecord, NewFileRecord};

/// Metadata repository for file records
///
/// Exclusively owns persistence of `FileRecord`; the lifecycle manager
/// decides when to create, mutate, or destroy, never how. Counter mutations
/// are relative SQL updates so concurrent increments on the same record are
/// never lost to stale reads.
#[derive(Clone)]
pub struct FileRepository {
    db: Database,
}

impl FileRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new record with counters at zero
    pub async fn create(&self, fields: NewFileRecord) -> Result<FileRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO files (id, title, description, storage_key, file_name, content_type, size, download_count, emails_sent, uploaded_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.storage_key)
        .bind(&fields.file_name)
        .bind(&fields.content_type)
        .bind(fields.size)
        .bind(&fields.uploaded_by)
        .bind(&now)
        .execute(self.db.pool())
        .await?;

        let record: FileRecord = sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(&id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(record)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>> {
        let record: Option<FileRecord> = sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(record)
    }

    pub async fn find_all(&self) -> Result<Vec<FileRecord>> {
        let records: Vec<FileRecord> =
            sqlx::query_as("SELECT * FROM files ORDER BY created_at DESC")
                .fetch_all(self.db.pool())
                .await?;

        Ok(records)
    }

    pub async fn increment_download_count(&self, id: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE files SET download_count = download_count + 1 WHERE id = ?")
                .bind(id)
                .execute(self.db.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Ok(())
    }

    pub async fn increment_emails_sent(&self, id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE files SET emails_sent = emails_sent + 1 WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Ok(())
    }
}
