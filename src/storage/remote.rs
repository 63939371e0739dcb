use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::config::RemoteStorageConfig;
use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// Remote key-addressed blob store over HTTPS
///
/// Objects live at `{base_url}/{key}` and are addressed with plain
/// PUT/GET/DELETE, authenticated by bearer token. The client is constructed
/// once at boot and shared; request timeouts are owned by the underlying
/// `reqwest` client.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpBlobStore {
    pub fn new(config: RemoteStorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token,
        }
    }

    fn url_for(&self, key: &str) -> String {
        // Keys keep their '/' separators; individual segments are escaped
        let path = key
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let resp = self
            .client
            .put(self.url_for(key))
            .header(AUTHORIZATION, self.bearer())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::StorageWrite(format!("put {}: {}", key, e)))?;

        if !resp.status().is_success() {
            return Err(AppError::StorageWrite(format!(
                "put {}: remote store returned {}",
                key,
                resp.status()
            )));
        }

        tracing::debug!("Uploaded blob {}", key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get(self.url_for(key))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| AppError::StorageRead(format!("get {}: {}", key, e)))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(AppError::NotFound(format!("Blob not found: {}", key))),
            status if status.is_success() => {
                let data = resp
                    .bytes()
                    .await
                    .map_err(|e| AppError::StorageRead(format!("get {}: {}", key, e)))?;
                Ok(data)
            }
            status => Err(AppError::StorageRead(format!(
                "get {}: remote store returned {}",
                key, status
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.url_for(key))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| AppError::StorageDelete(format!("delete {}: {}", key, e)))?;

        match resp.status() {
            // Already absent counts as deleted, same as the local store
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => {
                tracing::debug!("Deleted blob {}", key);
                Ok(())
            }
            status => Err(AppError::StorageDelete(format!(
                "delete {}: remote store returned {}",
                key, status
            ))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let resp = self
            .client
            .head(self.url_for(key))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| AppError::StorageRead(format!("head {}: {}", key, e)))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(AppError::StorageRead(format!(
                "head {}: remote store returned {}",
                key, status
            ))),
        }
    }

    fn store_type(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_escapes_segments() {
        let store = HttpBlobStore::new(RemoteStorageConfig {
            base_url: "https://blobs.example.com/".to_string(),
            access_token: "tok".to_string(),
        });

        assert_eq!(
            store.url_for("uploads/1-report.pdf"),
            "https://blobs.example.com/uploads/1-report.pdf"
        );
        assert_eq!(
            store.url_for("uploads/a b"),
            "https://blobs.example.com/uploads/a%20b"
        );
    }
}
