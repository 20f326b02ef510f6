//! Storage provider trait for pluggable object storage backends.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for object storage backends holding uploaded job files.
///
/// Paths are relative to the provider's root or bucket, e.g.
/// `"<job_id>/invoice.pdf"`. Implementations live in `docroute-storage`.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "http").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read an object into memory.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to an object, replacing any existing content.
    async fn write(&self, path: &str, data: Bytes) -> AppResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, path: &str) -> AppResult<bool>;
}
