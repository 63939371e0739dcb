use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{ApiResponse, AppError, Result};
use crate::models::{CurrentUser, FileRecord, ShareRequest, UploadRequest};
use crate::AppState;

/// List all files (file feed)
/// GET /api/v1/files
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<FileRecord>>>> {
    let files = state.lifecycle.list().await?;
    Ok(Json(ApiResponse::success(files)))
}

/// Search for a file by id; a miss is a normal 404, not an error log
/// GET /api/v1/files/:id
pub async fn search_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FileRecord>>> {
    let file = state.lifecycle.find(&id).await?;
    Ok(Json(ApiResponse::success(file)))
}

/// Upload a file
/// POST /api/v1/files/upload
///
/// Multipart fields: `title`, `description`, `file`. The upload is staged in
/// a temp file first; on lifecycle failure the temp copy is retained (and its
/// path logged) so the upload can be retried manually — it is the canonical
/// copy until the record exists.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileRecord>>)> {
    let mut temp_file_path: Option<PathBuf> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut title = String::new();
    let mut description = String::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to process multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());

                let temp_dir = std::env::temp_dir();
                let temp_path = temp_dir.join(format!("filedrop_upload_{}", Uuid::new_v4()));

                let mut file = tokio::fs::File::create(&temp_path)
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;

                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file chunk: {}", e)))?
                {
                    file.write_all(&chunk).await.map_err(|e| {
                        AppError::Internal(format!("Failed to write to temp file: {}", e))
                    })?;
                }

                file.flush()
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to flush temp file: {}", e)))?;

                temp_file_path = Some(temp_path);
            }
            "title" => {
                title = field.text().await.unwrap_or_default();
            }
            "description" => {
                description = field.text().await.unwrap_or_default();
            }
            _ => {}
        }
    }

    let temp_path =
        temp_file_path.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    let file_name = file_name.unwrap_or_else(|| "upload.bin".to_string());

    let bytes = tokio::fs::read(&temp_path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read temp file: {}", e)))?;

    let result = state
        .lifecycle
        .upload(UploadRequest {
            title,
            description,
            file_name,
            content_type,
            bytes: Bytes::from(bytes),
            uploaded_by: current_user.id,
        })
        .await;

    match result {
        Ok(record) => {
            // Only now is the temp copy redundant
            if let Err(e) = tokio::fs::remove_file(&temp_path).await {
                tracing::error!("Failed to remove temp file {:?}: {}", temp_path, e);
            }
            Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
        }
        Err(e) => {
            tracing::warn!(
                "Upload failed, temp copy retained at {:?} for manual retry",
                temp_path
            );
            Err(e)
        }
    }
}

/// Download a file as an attachment
/// GET /api/v1/files/:id/download
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let download = state.lifecycle.download(&id).await?;

    let content_type = download
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let fallback_name = download.file_name.replace(['"', '\\'], "_");
    let encoded_name = urlencoding::encode(&download.file_name);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, download.bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        )
        .body(Body::from(download.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Delete a file
/// DELETE /api/v1/files/:id
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.lifecycle.delete(&id).await?;
    Ok(Json(ApiResponse::<()>::success_message("File deleted")))
}

/// Share a file by email
/// POST /api/v1/files/:id/share
pub async fn share_file(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<ShareRequest>,
) -> Result<Json<ApiResponse<FileRecord>>> {
    let record = state.lifecycle.share(&id, req).await?;
    Ok(Json(ApiResponse::success(record)))
}
