//! Audio sources: where batch paths are fetched from
//!
//! - [`LocalAudioSource`]: files under a root directory
//! - [`HttpObjectSource`]: S3-compatible object store over HTTP(S)

pub mod http;
pub mod local;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

pub use self::http::HttpObjectSource;
pub use local::LocalAudioSource;

/// Fetch failures
#[derive(Debug, Error)]
pub enum FetchError {
    /// No object at this path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path is absolute, escapes the root, or is empty
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Transport or filesystem failure
    #[error("I/O error: {0}")]
    Io(String),
}

/// Source of raw audio bytes keyed by relative path
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Human-readable location for logs and health output
    fn describe(&self) -> String;

    /// Whether the source looks reachable (cheap, no network round trip)
    fn is_available(&self) -> bool;

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Build the configured audio source
pub fn from_config(config: &StorageConfig) -> echotag_common::Result<Arc<dyn AudioSource>> {
    use echotag_common::Error as CommonError;

    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalAudioSource::new(&config.root))),
        StorageBackend::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                CommonError::Config("storage.endpoint is required for the http backend".to_string())
            })?;
            let source = HttpObjectSource::new(endpoint, &config.bucket, config.token.clone())
                .map_err(|e| CommonError::Config(format!("Failed to build storage client: {}", e)))?;
            Ok(Arc::new(source))
        }
    }
}
