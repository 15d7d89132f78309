//! The object-storage seam the gateway talks to.
//!
//! `ObjectBackend` is deliberately close to the S3 wire operations the
//! gateway needs: put with metadata and a public-read ACL, get, delete, and one
//! page of a prefix listing. The gateway owns the bucket name and passes it on
//! every call.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("object `{key}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },
    #[error("storage request failed: {0}")]
    Request(String),
    #[error("content stream error: {0}")]
    Stream(#[from] io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Metadata attached to an object on put.
#[derive(Clone, Debug)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub content_length: u64,
    pub public_read: bool,
}

/// A single page of a prefix listing.
#[derive(Debug, Default)]
pub struct ListPage {
    /// Keys in the backend's listing order.
    pub keys: Vec<String>,

    /// Present when more pages follow; pass it back to fetch the next one.
    pub next_continuation_token: Option<String>,
}

#[async_trait]
pub trait ObjectBackend: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: PutOptions,
    ) -> BackendResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes>;

    /// Deleting a key that does not exist succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()>;

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> BackendResult<ListPage>;
}
