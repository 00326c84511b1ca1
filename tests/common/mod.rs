//! Shared fakes for pipeline and API tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tempfile::{TempDir, TempPath};
use uuid::Uuid;
use video_store::{
    config::{PipelineConfig, UrlMode},
    models::video::{NewVideo, Video},
    services::{
        object_store::{ObjectStore, ObjectStoreError, ObjectStoreResult},
        probe::{MediaInspector, ProbeError, StreamInfo, StreamMetadata},
        remux::{RemuxError, Remuxer, ensure_non_empty, output_path_for},
        upload_pipeline::UploadPipeline,
        video_repository::{RepositoryError, RepositoryResult, VideoRepository},
    },
};

pub const BUCKET: &str = "media-bucket";
pub const REGION: &str = "us-east-2";

pub fn pipeline_config(temp_dir: &Path, url_mode: UrlMode) -> PipelineConfig {
    PipelineConfig {
        bucket: BUCKET.into(),
        region: REGION.into(),
        url_mode,
        cdn_host: None,
        signed_url_expiry: Duration::from_secs(5),
        temp_dir: temp_dir.to_path_buf(),
    }
}

/// Number of entries left in `dir`.
pub fn entries_in(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

/// Inspector that reports a single video stream with a fixed aspect ratio.
pub struct FakeInspector {
    aspect_ratio: Option<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeInspector {
    pub fn with_ratio(ratio: &str) -> Self {
        Self {
            aspect_ratio: Some(ratio.to_string()),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            aspect_ratio: None,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of staged files this inspector was asked to look at.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaInspector for FakeInspector {
    async fn inspect(&self, path: &Path) -> Result<StreamMetadata, ProbeError> {
        assert!(path.exists(), "inspect ran against a missing staged file");
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProbeError::Failed {
                code: Some(1),
                stderr: "Invalid data found when processing input".into(),
            });
        }
        Ok(StreamMetadata {
            streams: vec![
                StreamInfo {
                    codec_type: "audio".into(),
                    display_aspect_ratio: None,
                },
                StreamInfo {
                    codec_type: "video".into(),
                    display_aspect_ratio: self.aspect_ratio.clone(),
                },
            ],
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum RemuxMode {
    /// Copy the input byte-for-byte to the output path.
    Copy,
    /// Simulate a tool that exits cleanly but writes nothing.
    EmptyOutput,
}

/// Remuxer honouring the same contract as the ffmpeg one, without ffmpeg.
pub struct FakeRemuxer {
    mode: RemuxMode,
}

impl FakeRemuxer {
    pub fn new(mode: RemuxMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Remuxer for FakeRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        let guard = TempPath::from_path(output_path_for(input));
        match self.mode {
            RemuxMode::Copy => {
                tokio::fs::copy(input, &guard).await?;
            }
            RemuxMode::EmptyOutput => {
                tokio::fs::write(&guard, b"").await?;
            }
        }
        ensure_non_empty(&guard).await?;
        Ok(guard.keep().map_err(|err| RemuxError::Io(err.error))?)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// Object store that records uploads in memory.
#[derive(Default)]
pub struct FakeObjectStore {
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub fail_uploads: AtomicBool,
    pub fail_signing: AtomicBool,
}

impl FakeObjectStore {
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    fn record(&self, bucket: &str, key: &str, content_type: &str, size: usize) -> ObjectStoreResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Upload("AccessDenied".into()));
        }
        self.uploads.lock().unwrap().push(RecordedUpload {
            bucket: bucket.into(),
            key: key.into(),
            content_type: content_type.into(),
            size,
        });
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        let size = tokio::fs::read(path)
            .await
            .map_err(|e| ObjectStoreError::Upload(e.to_string()))?
            .len();
        self.record(bucket, key, content_type, size)
    }

    async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        self.record(bucket, key, content_type, data.len())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Signing("no credentials".into()));
        }
        Ok(format!(
            "https://{}.s3.{}.amazonaws.com/{}?X-Amz-Expires={}&X-Amz-Signature=fake",
            bucket,
            REGION,
            key,
            expires_in.as_secs()
        ))
    }
}

/// In-memory metadata store.
#[derive(Default)]
pub struct InMemoryVideos {
    pub records: Mutex<HashMap<Uuid, Video>>,
    pub fail_reads: AtomicBool,
    pub fail_updates: AtomicBool,
}

impl InMemoryVideos {
    pub fn stored(&self, id: Uuid) -> Video {
        self.records.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideos {
    async fn get_video(&self, id: Uuid) -> RepositoryResult<Video> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn update_video(&self, video: &Video) -> RepositoryResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&video.id) {
            Some(existing) => {
                *existing = video.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(video.id)),
        }
    }

    async fn create_video(&self, new: NewVideo, user_id: Uuid) -> RepositoryResult<Video> {
        let video = Video::draft(new, user_id);
        self.records.lock().unwrap().insert(video.id, video.clone());
        Ok(video)
    }
}

/// Pipeline wired to in-memory fakes, plus handles to inspect them.
pub struct Harness {
    pub temp_dir: TempDir,
    pub videos: Arc<InMemoryVideos>,
    pub objects: Arc<FakeObjectStore>,
    pub pipeline: UploadPipeline,
}

impl Harness {
    pub fn new(inspector: FakeInspector, remux: RemuxMode, url_mode: UrlMode) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let videos = Arc::new(InMemoryVideos::default());
        let objects = Arc::new(FakeObjectStore::default());
        let pipeline = UploadPipeline::new(
            pipeline_config(temp_dir.path(), url_mode),
            videos.clone(),
            Arc::new(inspector),
            Arc::new(FakeRemuxer::new(remux)),
            objects.clone(),
        );
        Self {
            temp_dir,
            videos,
            objects,
            pipeline,
        }
    }

    pub async fn video_owned_by(&self, user_id: Uuid) -> Video {
        self.videos
            .create_video(
                NewVideo {
                    title: "boots".into(),
                    description: None,
                },
                user_id,
            )
            .await
            .unwrap()
    }
}

/// Build a `multipart/form-data` body with a single file field.
pub fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----video-store-test-boundary".to_string();
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.bin\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (boundary, body)
}
