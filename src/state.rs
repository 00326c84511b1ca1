use crate::services::{upload_pipeline::UploadPipeline, video_repository::VideoRepository};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Pool behind the video repository; used directly by readiness checks.
    pub db: Arc<SqlitePool>,
    pub videos: Arc<dyn VideoRepository>,
    pub pipeline: Arc<UploadPipeline>,
    pub jwt_secret: Arc<str>,
    /// Tool binaries checked by `/readyz`.
    pub tools: Arc<[PathBuf]>,
}
