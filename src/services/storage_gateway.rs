//! src/services/storage_gateway.rs
//!
//! StorageGateway: the only place that knows the bucket name and how public
//! URLs map to object keys. Every operation forwards to an `ObjectBackend`;
//! batch operations run sequentially and stop at the first failure without
//! undoing earlier work.

use super::backend::{BackendError, ObjectBackend, PutOptions};
use crate::models::upload::UploadRequest;
use bytes::Bytes;
use std::{io, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("URL does not belong to bucket: {url}")]
    InvalidUrl { url: String },
    #[error("failed to upload `{filename}`: {source}")]
    Upload {
        filename: String,
        #[source]
        source: BackendError,
    },
    #[error("object not found: {url}")]
    NotFound { url: String },
    #[error("{operation} failed for `{target}`: {source}")]
    Backend {
        operation: &'static str,
        target: String,
        #[source]
        source: BackendError,
    },
}

impl GatewayError {
    /// The inbound content for `filename` could not be read.
    pub fn unreadable(filename: impl Into<String>, err: io::Error) -> Self {
        GatewayError::Upload {
            filename: filename.into(),
            source: BackendError::Stream(err),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Bucket identity, fixed at startup.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub bucket: String,

    /// URL of the bucket itself (the URL of the empty key). Always ends in `/`.
    pub base_url: String,
}

impl GatewayConfig {
    pub fn new(bucket: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            bucket: bucket.into(),
            base_url,
        }
    }
}

#[derive(Clone)]
pub struct StorageGateway {
    backend: Arc<dyn ObjectBackend>,
    config: Arc<GatewayConfig>,
}

impl StorageGateway {
    pub fn new(backend: Arc<dyn ObjectBackend>, config: GatewayConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Public URL for `key`. Each path segment is percent-encoded; `/` is kept.
    pub fn url_for_key(&self, key: &str) -> String {
        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}{}", self.config.base_url, encoded)
    }

    /// Inverse of [`url_for_key`](Self::url_for_key). Rejects any URL that
    /// does not start with the bucket's base URL, and the base URL itself.
    pub fn key_for_url(&self, url: &str) -> GatewayResult<String> {
        let invalid = || GatewayError::InvalidUrl {
            url: url.to_string(),
        };
        let remainder = url
            .strip_prefix(self.config.base_url.as_str())
            .filter(|rest| !rest.is_empty())
            .ok_or_else(invalid)?;
        urlencoding::decode(remainder)
            .map(|key| key.into_owned())
            .map_err(|_| invalid())
    }

    /// Upload one file under a freshly generated key and return its URL.
    pub async fn save(&self, upload: UploadRequest) -> GatewayResult<String> {
        let key = unique_key(&upload.filename);
        let content_length = upload.len();
        let options = PutOptions {
            content_type: upload.content_type,
            content_length,
            public_read: true,
        };

        debug!(
            "uploading `{}` as key {} ({} bytes)",
            upload.filename, key, options.content_length
        );

        if let Err(source) = self
            .backend
            .put_object(&self.config.bucket, &key, upload.content, options)
            .await
        {
            warn!("upload of `{}` failed: {}", upload.filename, source);
            return Err(GatewayError::Upload {
                filename: upload.filename,
                source,
            });
        }

        let url = self.url_for_key(&key);
        info!("stored `{}` at {}", upload.filename, url);
        Ok(url)
    }

    /// Upload files one after another. Output order matches input order.
    /// The first failure is returned as-is; files already stored stay stored.
    pub async fn save_many(&self, uploads: Vec<UploadRequest>) -> GatewayResult<Vec<String>> {
        let mut urls = Vec::with_capacity(uploads.len());
        for upload in uploads {
            urls.push(self.save(upload).await?);
        }
        Ok(urls)
    }

    /// Fetch the full content of the object behind `url`.
    pub async fn load(&self, url: &str) -> GatewayResult<Bytes> {
        let key = self.key_for_url(url)?;
        debug!("loading key {}", key);

        self.backend
            .get_object(&self.config.bucket, &key)
            .await
            .map_err(|source| match source {
                BackendError::NotFound { .. } => GatewayError::NotFound {
                    url: url.to_string(),
                },
                other => GatewayError::Backend {
                    operation: "load",
                    target: url.to_string(),
                    source: other,
                },
            })
    }

    pub async fn delete(&self, url: &str) -> GatewayResult<()> {
        let key = self.key_for_url(url)?;

        self.backend
            .delete_object(&self.config.bucket, &key)
            .await
            .map_err(|source| GatewayError::Backend {
                operation: "delete",
                target: url.to_string(),
                source,
            })?;

        info!("deleted key {}", key);
        Ok(())
    }

    /// Delete in input order, stopping at the first failure.
    pub async fn delete_many(&self, urls: &[String]) -> GatewayResult<()> {
        for url in urls {
            self.delete(url).await?;
        }
        Ok(())
    }

    /// URLs of every object whose key starts with `prefix`, across all pages.
    pub async fn list(&self, prefix: Option<&str>) -> GatewayResult<Vec<String>> {
        let prefix = prefix.unwrap_or("");
        let mut urls = Vec::new();
        let mut continuation_token = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .backend
                .list_objects(&self.config.bucket, prefix, continuation_token)
                .await
                .map_err(|source| GatewayError::Backend {
                    operation: "list",
                    target: prefix.to_string(),
                    source,
                })?;
            pages += 1;

            urls.extend(page.keys.iter().map(|key| self.url_for_key(key)));

            continuation_token = page.next_continuation_token;
            if continuation_token.is_none() {
                break;
            }
        }

        debug!(
            "listed {} objects under `{}` in {} page(s)",
            urls.len(),
            prefix,
            pages
        );
        Ok(urls)
    }

    /// Single listing call against the bucket, used by readiness checks.
    pub async fn probe(&self) -> GatewayResult<()> {
        self.backend
            .list_objects(&self.config.bucket, "", None)
            .await
            .map(|_| ())
            .map_err(|source| GatewayError::Backend {
                operation: "probe",
                target: self.config.bucket.clone(),
                source,
            })
    }
}

/// `<uuid>_<filename>` with every whitespace run collapsed to one `_`.
fn unique_key(filename: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename))
}

fn sanitize_filename(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    let mut in_whitespace = false;
    for c in filename.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}
