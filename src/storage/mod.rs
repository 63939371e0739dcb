pub mod local;
pub mod provider;
pub mod remote;

pub use local::*;
pub use provider::*;
pub use remote::*;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Build the blob store selected by configuration. Constructed once at boot
/// and injected into the lifecycle manager.
pub fn from_config(config: &Config) -> Result<Arc<dyn BlobStore>> {
    match config.storage.backend.as_str() {
        "local" => Ok(Arc::new(LocalBlobStore::new(
            config.storage.local_path.clone(),
        ))),
        "remote" => {
            if config.storage.remote.base_url.is_empty() {
                return Err(AppError::Internal(
                    "storage.remote.base_url is required for the remote backend".to_string(),
                ));
            }
            Ok(Arc::new(HttpBlobStore::new(config.storage.remote.clone())))
        }
        other => Err(AppError::Internal(format!(
            "Unknown storage backend: {}",
            other
        ))),
    }
}
