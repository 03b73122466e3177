//! S3 (and S3-compatible) object store.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;

use super::store::{ObjectStore, PutObject};
use crate::config::StorageConfig;
use crate::utils::errors::{FetchError, Result, SyncError};

pub struct S3Store {
    client: S3Client,
    bucket: String,
}

impl S3Store {
    /// Build a client for the configured bucket.
    ///
    /// Credentials come from the default provider chain
    /// (`AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, profiles, IMDS).
    pub async fn connect(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared);
        if config.endpoint.is_some() {
            // MinIO and friends do not serve virtual-hosted buckets
            s3_config = s3_config.force_path_style(true);
        }

        Self {
            client: S3Client::from_conf(s3_config.build()),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn check_access(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                SyncError::Storage(format!(
                    "cannot access bucket {}: {}",
                    self.bucket,
                    e.into_service_error()
                ))
            })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    FetchError::NotFound
                } else {
                    FetchError::Storage(service_error.to_string())
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| FetchError::Storage(e.to_string()))?
            .into_bytes();

        tracing::debug!("Downloaded {} bytes from s3://{}/{}", data.len(), self.bucket, key);
        Ok(data.to_vec())
    }

    async fn put(&self, object: PutObject) -> Result<()> {
        let size = object.body.len();
        let metadata = object.metadata;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object.key)
            .acl(ObjectCannedAcl::from(metadata.access_policy.as_str()))
            .content_type(metadata.content_type)
            .cache_control(metadata.cache_control)
            .set_content_encoding(metadata.content_encoding)
            .content_length(size as i64)
            .body(ByteStream::from(object.body))
            .send()
            .await
            .map_err(|e| SyncError::Storage(e.into_service_error().to_string()))?;

        tracing::debug!("Uploaded {} bytes to s3://{}/{}", size, self.bucket, object.key);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
