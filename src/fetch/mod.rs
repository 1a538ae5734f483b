//! Asset fetching abstraction
//!
//! The materializer pulls bytes through the [`AssetFetcher`] trait. Real
//! deployments back it with the content-addressed blob gateway (which enforces
//! a size ceiling) and a plain HTTP client. [`MockFetcher`] serves bytes from
//! memory for tests.

pub mod mock;

pub use mock::{FetchWindow, MockFetcher};

use async_trait::async_trait;
use thiserror::Error;

use crate::scene::ResourceLocation;

/// Default blob size ceiling enforced by the gateway (10 MiB)
pub const DEFAULT_MAX_BLOB_BYTES: u64 = 10 * 1024 * 1024;

/// Error type for fetch operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Blob {blob_id} is {size} bytes, above the gateway ceiling of {limit} bytes")]
    TooLarge { blob_id: String, size: u64, limit: u64 },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Transfer of {key} failed: {message}")]
    Transfer { key: String, message: String },
}

/// Byte counts of an in-progress transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub loaded: u64,
    /// Known only when the transfer exposes a length
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Integer percentage, when the total is known
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(total) if total > 0 => Some((self.loaded.min(total) * 100 / total) as u8),
            _ => None,
        }
    }
}

/// Callback receiving transfer progress
pub type ProgressSink<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// Source of asset bytes
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// GET a content-addressed blob through the gateway
    async fn fetch_blob(
        &self,
        blob_id: &str,
        progress: ProgressSink<'_>,
    ) -> Result<Vec<u8>, FetchError>;

    /// GET an arbitrary URL
    async fn fetch_url(&self, url: &str, progress: ProgressSink<'_>)
        -> Result<Vec<u8>, FetchError>;

    /// Dispatch on the location kind
    async fn fetch(
        &self,
        location: &ResourceLocation,
        progress: ProgressSink<'_>,
    ) -> Result<Vec<u8>, FetchError> {
        match location {
            ResourceLocation::Blob(blob_id) => self.fetch_blob(blob_id, progress).await,
            ResourceLocation::Url(url) => self.fetch_url(url, progress).await,
        }
    }
}

/// Blob gateway settings
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Aggregator base URL; blob ids are appended as a path segment
    pub base_url: String,
    pub max_blob_bytes: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aggregator.walrus-testnet.walrus.space/v1/blobs".to_string(),
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
        }
    }
}

impl GatewayConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_blob_bytes(mut self, max_blob_bytes: u64) -> Self {
        self.max_blob_bytes = max_blob_bytes;
        self
    }

    /// Gateway URL serving a blob
    pub fn blob_url(&self, blob_id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), blob_id)
    }

    /// Check a blob size against the ceiling
    pub fn check_size(&self, blob_id: &str, size: u64) -> Result<(), FetchError> {
        if size > self.max_blob_bytes {
            return Err(FetchError::TooLarge {
                blob_id: blob_id.to_string(),
                size,
                limit: self.max_blob_bytes,
            });
        }
        Ok(())
    }
}
