//! Durable object storage and URL resolution.
//!
//! [`ObjectStore`] is the seam the upload pipeline talks to; [`S3ObjectStore`]
//! is the production implementation on top of `aws-sdk-s3`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Builder, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use bytes::Bytes;
use std::{path::Path, time::Duration};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the contents of a local file to `bucket/key`.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> ObjectStoreResult<()>;

    /// Upload an in-memory body to `bucket/key`.
    async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> ObjectStoreResult<()>;

    /// Presigned GET URL for `bucket/key`, valid for `expires_in`.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String>;
}

/// A persisted media reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLocation {
    /// Already a usable URL (static bucket URL, CDN URL, or anything
    /// unrecognised, which is passed through untouched).
    Url(String),
    /// Raw `<bucket>,<key>` pair that must be signed before use.
    Object { bucket: String, key: String },
}

impl ObjectLocation {
    pub fn object(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        ObjectLocation::Object {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Interpret a stored reference.
    pub fn parse(stored: &str) -> Self {
        if stored.starts_with("https://") || stored.starts_with("http://") {
            return ObjectLocation::Url(stored.to_string());
        }
        match stored.split_once(',') {
            Some((bucket, key)) if is_bucket_name(bucket) && !key.is_empty() => {
                ObjectLocation::object(bucket, key)
            }
            _ => ObjectLocation::Url(stored.to_string()),
        }
    }

    /// The string form written to the metadata store.
    pub fn to_reference(&self) -> String {
        match self {
            ObjectLocation::Url(url) => url.clone(),
            ObjectLocation::Object { bucket, key } => format!("{},{}", bucket, key),
        }
    }
}

fn is_bucket_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
}

/// Permanent URL for a public object, optionally fronted by a CDN host.
pub fn static_url(bucket: &str, region: &str, cdn_host: Option<&str>, key: &str) -> String {
    match cdn_host {
        Some(host) if host.starts_with("https://") || host.starts_with("http://") => {
            format!("{}/{}", host.trim_end_matches('/'), key)
        }
        Some(host) => format!("https://{}/{}", host.trim_end_matches('/'), key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

/// S3 (or S3-compatible) object store.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client from the ambient AWS credential chain.
    ///
    /// `endpoint_url` targets S3-compatible providers (MinIO, R2) and switches
    /// to path-style addressing.
    pub async fn from_env(region: &str, endpoint_url: Option<&str>) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut builder = Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::from_client(Client::from_conf(builder.build()))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        debug!("Uploading {} to {}/{}", path.display(), bucket, key);
        let start = std::time::Instant::now();

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| ObjectStoreError::Upload(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                let detail = DisplayErrorContext(&e).to_string();
                error!(
                    error = %detail,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                ObjectStoreError::Upload(detail)
            })?;

        debug!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(())
    }

    async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        let size = data.len();
        debug!("Uploading {} bytes to {}/{}", size, bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                let detail = DisplayErrorContext(&e).to_string();
                error!(error = %detail, bucket = %bucket, key = %key, size_bytes = size, "S3 upload failed");
                ObjectStoreError::Upload(detail)
            })?;

        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| ObjectStoreError::Signing(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| ObjectStoreError::Signing(DisplayErrorContext(&e).to_string()))?;

        Ok(presigned.uri().to_string())
    }
}
