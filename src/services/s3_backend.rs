//! `ObjectBackend` over the AWS S3 SDK. Works against AWS and any
//! S3-compatible endpoint (MinIO, R2, ...) when an endpoint URL is configured.

use super::backend::{BackendError, BackendResult, ListPage, ObjectBackend, PutOptions};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client,
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::ObjectCannedAcl,
};
use bytes::Bytes;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct S3Backend {
    client: Client,
}

/// Connection settings for the S3 client. Credentials are resolved by the
/// default AWS provider chain.
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub region: String,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
}

impl S3Backend {
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();

        debug!(
            "S3 client ready (region={}, endpoint={:?}, path_style={})",
            settings.region, settings.endpoint, settings.force_path_style
        );

        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

fn request_error<E>(operation: &str, err: E) -> BackendError
where
    E: std::error::Error,
{
    let message = format!("{}: {}", operation, DisplayErrorContext(&err));
    warn!("{}", message);
    BackendError::Request(message)
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: PutOptions,
    ) -> BackendResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(options.content_length as i64)
            .set_content_type(options.content_type)
            .body(ByteStream::from(body));
        if options.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request
            .send()
            .await
            .map_err(|err| request_error("PutObject", err))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes> {
        let response = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(response) => response,
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false) =>
            {
                return Err(BackendError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(err) => return Err(request_error("GetObject", err)),
        };

        let aggregated = response
            .body
            .collect()
            .await
            .map_err(|err| request_error("GetObject body", err))?;
        Ok(aggregated.into_bytes())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| request_error("DeleteObject", err))?;
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> BackendResult<ListPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|err| request_error("ListObjectsV2", err))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();

        let next_continuation_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            keys,
            next_continuation_token,
        })
    }
}
