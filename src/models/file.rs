use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// File metadata record
///
/// `storage_key` addresses the blob in the remote store; it is set exactly
/// once at creation and never points at a blob that was not written first.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub storage_key: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub download_count: i64,
    pub emails_sent: i64,
    pub uploaded_by: String,
    pub created_at: String,
}

/// Fields for creating a new file record (counters start at zero)
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub title: String,
    pub description: String,
    pub storage_key: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub uploaded_by: String,
}

/// Validated upload input handed to the lifecycle manager
#[derive(Debug)]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub uploaded_by: String,
}

/// Downloaded file: bytes plus what the caller needs to present them
/// as an attachment
#[derive(Debug)]
pub struct FileDownload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Share-by-email request body
#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub recipient_email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
