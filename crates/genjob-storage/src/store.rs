//! Object storage abstraction used by the uploader.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Durable, publicly readable object storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key`, replacing any existing object.
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Public URL an uploaded object is served from.
    fn public_url(&self, key: &str) -> String;

    async fn check_connectivity(&self) -> StorageResult<()>;
}
