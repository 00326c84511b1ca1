//! Defines routes for video records and media uploads.
//!
//! ## Structure
//! - **Health**
//!   - `GET  /healthz`: liveness
//!   - `GET  /readyz`: readiness (SQLite, temp dir, media tools)
//!
//! - **Videos** (bearer token required)
//!   - `POST /api/videos`: create a draft record
//!   - `GET  /api/videos/{video_id}`: fetch a record with resolved URLs
//!   - `POST /api/video_upload/{video_id}`: multipart `video`, processed and stored
//!   - `POST /api/thumbnail_upload/{video_id}`: multipart `thumbnail`, stored as-is

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{create_video, get_video, upload_thumbnail, upload_video},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Request body limits for the upload routes.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub video_bytes: usize,
    pub thumbnail_bytes: usize,
}

/// Build and return the router. Carries `AppState` to all handlers.
pub fn routes(limits: BodyLimits) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // video records
        .route("/api/videos", post(create_video))
        .route("/api/videos/{video_id}", get(get_video))
        // uploads
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(DefaultBodyLimit::max(limits.video_bytes)),
        )
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(limits.thumbnail_bytes)),
        )
}
