//! In-process `ObjectBackend` used for local development (`--backend memory`)
//! and by the test suites.
//!
//! Objects live in a key-ordered map per bucket. Listing is paginated with
//! `page_size` and uses the last returned key as the continuation token, so
//! callers see the same multi-page protocol they get from S3.

use super::backend::{BackendError, BackendResult, ListPage, ObjectBackend, PutOptions};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
};
use tokio::sync::RwLock;

pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Clone, Debug)]
pub struct StoredEntry {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub public_read: bool,
}

pub struct MemoryBackend {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredEntry>>>,
    page_size: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl MemoryBackend {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Look up an entry without going through the trait.
    pub async fn entry(&self, bucket: &str, key: &str) -> Option<StoredEntry> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket).and_then(|objects| objects.get(key)).cloned()
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: PutOptions,
    ) -> BackendResult<()> {
        if body.len() as u64 != options.content_length {
            return Err(BackendError::Request(format!(
                "content length mismatch for `{}`: declared {}, received {}",
                key,
                options.content_length,
                body.len()
            )));
        }

        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredEntry {
                body,
                content_type: options.content_type,
                public_read: options.public_read,
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes> {
        self.entry(bucket, key)
            .await
            .map(|entry| entry.body)
            .ok_or_else(|| BackendError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()> {
        let mut buckets = self.buckets.write().await;
        if let Some(objects) = buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> BackendResult<ListPage> {
        let buckets = self.buckets.read().await;
        let Some(objects) = buckets.get(bucket) else {
            return Ok(ListPage::default());
        };

        let lower = match continuation_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Included(prefix.to_string()),
        };

        let mut matching = objects
            .range((lower, Bound::Unbounded))
            .map(|(key, _)| key)
            .skip_while(|key| key.as_str() < prefix)
            .take_while(|key| key.starts_with(prefix));

        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let has_more = matching.next().is_some();

        let next_continuation_token = if has_more { keys.last().cloned() } else { None };

        Ok(ListPage {
            keys,
            next_continuation_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(len: usize) -> PutOptions {
        PutOptions {
            content_type: Some("text/plain".into()),
            content_length: len as u64,
            public_read: true,
        }
    }

    async fn put(backend: &MemoryBackend, key: &str) {
        backend
            .put_object("b", key, Bytes::from_static(b"x"), opts(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let backend = MemoryBackend::default();
        let err = backend.get_object("b", "nope").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_missing_succeeds() {
        let backend = MemoryBackend::default();
        backend.delete_object("b", "nope").await.unwrap();
    }

    #[tokio::test]
    async fn put_rejects_length_mismatch() {
        let backend = MemoryBackend::default();
        let err = backend
            .put_object("b", "k", Bytes::from_static(b"abc"), opts(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Request(_)));
    }

    #[tokio::test]
    async fn list_paginates_within_prefix() {
        let backend = MemoryBackend::with_page_size(2);
        for key in ["a/1", "a/2", "a/3", "b/1", "a0"] {
            put(&backend, key).await;
        }

        let first = backend.list_objects("b", "a/", None).await.unwrap();
        assert_eq!(first.keys, vec!["a/1", "a/2"]);
        let token = first.next_continuation_token.clone();
        assert_eq!(token.as_deref(), Some("a/2"));

        let second = backend.list_objects("b", "a/", token).await.unwrap();
        assert_eq!(second.keys, vec!["a/3"]);
        assert!(second.next_continuation_token.is_none());
    }

    #[tokio::test]
    async fn exact_page_boundary_has_no_token() {
        let backend = MemoryBackend::with_page_size(2);
        put(&backend, "x/1").await;
        put(&backend, "x/2").await;

        let page = backend.list_objects("b", "x/", None).await.unwrap();
        assert_eq!(page.keys.len(), 2);
        assert!(page.next_continuation_token.is_none());
    }

    #[tokio::test]
    async fn list_unknown_bucket_is_empty() {
        let backend = MemoryBackend::default();
        let page = backend.list_objects("missing", "", None).await.unwrap();
        assert!(page.keys.is_empty());
        assert!(page.next_continuation_token.is_none());
    }
}
