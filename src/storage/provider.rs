use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Key-addressed blob store
///
/// Keys are opaque strings scoped under an application-chosen prefix
/// (`uploads/<name>`); there are no directory semantics beyond the key
/// convention. Operations are idempotent at the key level: re-putting a key
/// overwrites, deleting an absent key succeeds. No operation retries; every
/// failure propagates to the caller.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write bytes under `key`, overwriting any existing blob
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Read the blob under `key`; a missing key is `AppError::NotFound`
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Delete the blob under `key`; deleting an absent key is success
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a blob exists under `key`
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Get the store type name
    fn store_type(&self) -> &'static str;
}
