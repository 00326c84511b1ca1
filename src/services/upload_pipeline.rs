//! Upload pipeline: authorize → stage → probe → remux → upload → persist → resolve.
//!
//! Every temporary file is owned by a drop guard from the moment it exists
//! (`NamedTempFile` for the staged upload, `TempPath` for the remuxed
//! output), so each one is removed exactly once when the request finishes,
//! whichever step failed.

use crate::{
    config::{PipelineConfig, UrlMode},
    models::video::Video,
    services::{
        keys,
        object_store::{ObjectLocation, ObjectStore, ObjectStoreError, static_url},
        probe::{MediaInspector, ProbeError, probe_orientation},
        remux::{RemuxError, Remuxer},
        video_repository::{RepositoryError, VideoRepository},
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use std::{io, sync::Arc, time::Instant};
use tempfile::{NamedTempFile, TempPath};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The only content type accepted for video uploads.
pub const ACCEPTED_VIDEO_TYPE: &str = "video/mp4";

/// Accepted thumbnail content types and the extension stored with each.
pub const ACCEPTED_THUMBNAIL_TYPES: [(&str, &str); 2] = [("image/jpeg", "jpg"), ("image/png", "png")];

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),
    #[error("remux failed: {0}")]
    Remux(#[from] RemuxError),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    BadRequest(String),
    #[error("user is not the owner of the video")]
    Forbidden,
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error("staging upload failed: {0}")]
    Staging(#[source] io::Error),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error("object upload failed: {0}")]
    StoreUpload(#[source] ObjectStoreError),
    #[error("URL signing failed: {0}")]
    Signing(#[source] ObjectStoreError),
    #[error("metadata update failed: {0}")]
    Persistence(#[source] RepositoryError),
    #[error("metadata lookup failed: {0}")]
    Lookup(#[source] RepositoryError),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Reduce a `Content-Type` header value to its lowercase `type/subtype`.
///
/// Parameters are ignored. Returns `None` when the value is not a media type.
pub fn parse_media_type(raw: &str) -> Option<String> {
    let essence = raw.split(';').next()?.trim();
    let (kind, subtype) = essence.split_once('/')?;
    let is_token = |s: &str| {
        !s.is_empty()
            && s.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$&^_.+-".contains(&b))
    };
    if is_token(kind) && is_token(subtype) {
        Some(essence.to_ascii_lowercase())
    } else {
        None
    }
}

/// Validate a declared content type against an allow-list.
pub fn accept_content_type(declared: Option<&str>, accepted: &[&str]) -> UploadResult<String> {
    let media_type = declared
        .and_then(parse_media_type)
        .ok_or_else(|| UploadError::BadRequest("Invalid Content-Type".into()))?;

    if accepted.contains(&media_type.as_str()) {
        Ok(media_type)
    } else {
        Err(UploadError::BadRequest("Invalid file type".into()))
    }
}

fn thumbnail_extension(media_type: &str) -> UploadResult<&'static str> {
    ACCEPTED_THUMBNAIL_TYPES
        .iter()
        .find(|(accepted, _)| *accepted == media_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| UploadError::BadRequest("Invalid file type".into()))
}

/// Drives an upload from request body to persisted record.
///
/// Holds no per-request state; one instance serves all requests concurrently.
pub struct UploadPipeline {
    config: PipelineConfig,
    videos: Arc<dyn VideoRepository>,
    inspector: Arc<dyn MediaInspector>,
    remuxer: Arc<dyn Remuxer>,
    objects: Arc<dyn ObjectStore>,
}

impl UploadPipeline {
    pub fn new(
        config: PipelineConfig,
        videos: Arc<dyn VideoRepository>,
        inspector: Arc<dyn MediaInspector>,
        remuxer: Arc<dyn Remuxer>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            videos,
            inspector,
            remuxer,
            objects,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch `video_id` and check that `user_id` owns it.
    pub async fn authorize(&self, user_id: Uuid, video_id: Uuid) -> UploadResult<Video> {
        let video = self
            .videos
            .get_video(video_id)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound(id) => UploadError::NotFound(id),
                other => UploadError::Lookup(other),
            })?;

        if video.user_id != user_id {
            warn!(video_id = %video_id, user_id = %user_id, owner_id = %video.user_id, "ownership check failed");
            return Err(UploadError::Forbidden);
        }

        Ok(video)
    }

    /// Stage, probe, remux and upload a video body, then point `video` at the
    /// uploaded object. `content_type` must already be validated.
    pub async fn upload_video<S>(
        &self,
        mut video: Video,
        content_type: &str,
        body: S,
    ) -> UploadResult<Video>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let start = Instant::now();
        info!(video_id = %video.id, user_id = %video.user_id, "uploading video");

        let (staged, size_bytes) = self.stage(body).await?;

        let orientation = probe_orientation(self.inspector.as_ref(), staged.path())
            .await
            .map_err(ProcessingError::from)?;

        let processed = TempPath::from_path(
            self.remuxer
                .remux(staged.path())
                .await
                .map_err(ProcessingError::from)?,
        );

        let key = keys::video_key(orientation);
        self.objects
            .upload_file(&self.config.bucket, &key, &processed, content_type)
            .await
            .map_err(UploadError::StoreUpload)?;

        video.video_url = Some(self.reference_for(&key));
        self.persist(&mut video, &key).await?;

        info!(
            video_id = %video.id,
            key = %key,
            orientation = %orientation,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "video upload complete"
        );

        self.resolve_urls(video).await
    }

    /// Upload thumbnail bytes as-is and point `video` at them.
    pub async fn upload_thumbnail(
        &self,
        mut video: Video,
        content_type: &str,
        data: Bytes,
    ) -> UploadResult<Video> {
        let extension = thumbnail_extension(content_type)?;
        let key = keys::thumbnail_key(extension);
        let size_bytes = data.len();

        self.objects
            .upload_bytes(&self.config.bucket, &key, data, content_type)
            .await
            .map_err(UploadError::StoreUpload)?;

        video.thumbnail_url = Some(self.reference_for(&key));
        self.persist(&mut video, &key).await?;

        info!(video_id = %video.id, key = %key, size_bytes, "thumbnail upload complete");
        self.resolve_urls(video).await
    }

    /// Turn stored references into URLs a client can fetch.
    ///
    /// `<bucket>,<key>` references get a fresh presigned URL on every call;
    /// the record in the store keeps the raw pair.
    pub async fn resolve_urls(&self, mut video: Video) -> UploadResult<Video> {
        if let Some(stored) = video.video_url.take() {
            video.video_url = Some(self.resolve_reference(&stored).await?);
        }
        if let Some(stored) = video.thumbnail_url.take() {
            video.thumbnail_url = Some(self.resolve_reference(&stored).await?);
        }
        Ok(video)
    }

    async fn resolve_reference(&self, stored: &str) -> UploadResult<String> {
        match ObjectLocation::parse(stored) {
            ObjectLocation::Url(url) => Ok(url),
            ObjectLocation::Object { bucket, key } => self
                .objects
                .presign_get(&bucket, &key, self.config.signed_url_expiry)
                .await
                .map_err(UploadError::Signing),
        }
    }

    /// What gets persisted for `key` under the configured URL mode.
    fn reference_for(&self, key: &str) -> String {
        match self.config.url_mode {
            UrlMode::Static => static_url(
                &self.config.bucket,
                &self.config.region,
                self.config.cdn_host.as_deref(),
                key,
            ),
            UrlMode::Signed => ObjectLocation::object(&self.config.bucket, key).to_reference(),
        }
    }

    async fn persist(&self, video: &mut Video, key: &str) -> UploadResult<()> {
        video.updated_at = Utc::now();
        self.videos.update_video(video).await.map_err(|err| {
            // TODO: delete the orphaned object or queue it for a reconciliation sweep.
            warn!(
                video_id = %video.id,
                bucket = %self.config.bucket,
                key = %key,
                "object uploaded but metadata update failed; object is orphaned"
            );
            UploadError::Persistence(err)
        })
    }

    /// Copy `body` into a new temp file under the configured temp dir and
    /// rewind it. The returned handle deletes the file when dropped.
    async fn stage<S>(&self, body: S) -> UploadResult<(NamedTempFile, u64)>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let staged = tempfile::Builder::new()
            .prefix("video-upload-")
            .suffix(".mp4")
            .tempfile_in(&self.config.temp_dir)
            .map_err(UploadError::Staging)?;

        let handle = staged.as_file().try_clone().map_err(UploadError::Staging)?;
        let mut file = File::from_std(handle);

        let mut size_bytes: u64 = 0;
        pin_mut!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(UploadError::Staging)?;
            size_bytes += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(UploadError::Staging)?;
        }
        file.flush().await.map_err(UploadError::Staging)?;
        file.rewind().await.map_err(UploadError::Staging)?;

        debug!(path = %staged.path().display(), size_bytes, "staged upload");
        Ok((staged, size_bytes))
    }
}
