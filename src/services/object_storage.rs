//! Remote object storage for uploaded videos.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client, primitives::ByteStream};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStorageError {
    #[error("could not read `{path}`: {reason}")]
    ReadFailed { path: String, reason: String },
    #[error("upload of `{key}` failed: {reason}")]
    UploadFailed { key: String, reason: String },
}

pub type ObjectStorageResult<T> = Result<T, ObjectStorageError>;

/// Key-addressed blob store.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload the file at `path` under `key`, tagged with `content_type`.
    async fn put_object(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> ObjectStorageResult<()>;

    /// Public URL an object stored under `key` is reachable at.
    fn object_url(&self, key: &str) -> String;
}

/// S3 (or S3-compatible) bucket.
#[derive(Clone)]
pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    public_url: Option<String>,
}

impl S3ObjectStorage {
    /// Build a client from the default credential chain.
    ///
    /// `endpoint_url` switches to path-style addressing for MinIO and friends.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_url: Option<String>,
    ) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        let client = match endpoint_url.as_deref() {
            Some(endpoint) => {
                let s3_config = aws_sdk_s3::config::Builder::from(&config)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(s3_config)
            }
            None => Client::new(&config),
        };

        Self::from_client(client, bucket, region, endpoint_url, public_url)
    }

    pub fn from_client(
        client: Client,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_url: Option<String>,
    ) -> Self {
        Self {
            client,
            bucket,
            region,
            endpoint_url,
            public_url,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put_object(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> ObjectStorageResult<()> {
        let start = std::time::Instant::now();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| ObjectStorageError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                ObjectStorageError::UploadFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        object_url_for(
            &self.bucket,
            &self.region,
            self.endpoint_url.as_deref(),
            self.public_url.as_deref(),
            key,
        )
    }
}

/// Public base wins, then path-style custom endpoint, then the virtual-hosted AWS form.
fn object_url_for(
    bucket: &str,
    region: &str,
    endpoint_url: Option<&str>,
    public_url: Option<&str>,
    key: &str,
) -> String {
    if let Some(base) = public_url {
        format!("{}/{}", base.trim_end_matches('/'), key)
    } else if let Some(endpoint) = endpoint_url {
        format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key)
    } else {
        format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
    }
}
