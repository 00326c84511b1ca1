//! HTTP handlers for video records and their media uploads.
//! Video bodies are streamed into the upload pipeline without buffering the
//! whole file in memory.

use crate::{
    errors::AppError,
    handlers::auth::AuthUser,
    models::video::{NewVideo, Video},
    services::upload_pipeline::{
        ACCEPTED_THUMBNAIL_TYPES, ACCEPTED_VIDEO_TYPE, accept_content_type,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use std::io;
use uuid::Uuid;

/// `POST /api/videos`: create a draft record owned by the caller.
pub async fn create_video(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<NewVideo>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }

    let video = state.videos.create_video(payload, auth.user_id).await?;
    tracing::info!(video_id = %video.id, user_id = %auth.user_id, "created video record");
    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos/{video_id}`: fetch a record with freshly resolved URLs.
pub async fn get_video(
    State(state): State<AppState>,
    auth: AuthUser,
    video_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Video>, AppError> {
    let Path(video_id) = video_id?;
    let video = state.pipeline.authorize(auth.user_id, video_id).await?;
    let video = state.pipeline.resolve_urls(video).await?;
    Ok(Json(video))
}

/// `POST /api/video_upload/{video_id}`: multipart field `video`.
pub async fn upload_video(
    State(state): State<AppState>,
    auth: AuthUser,
    video_id: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Video>, AppError> {
    let Path(video_id) = video_id?;
    let mut multipart = multipart?;
    let video = state.pipeline.authorize(auth.user_id, video_id).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("video") {
            continue;
        }

        let media_type = accept_content_type(field.content_type(), &[ACCEPTED_VIDEO_TYPE])?;
        let body = field.map(|chunk| chunk.map_err(io::Error::other));

        let video = state.pipeline.upload_video(video, &media_type, body).await?;
        return Ok(Json(video));
    }

    Err(AppError::bad_request("Unable to parse form file"))
}

/// `POST /api/thumbnail_upload/{video_id}`: multipart field `thumbnail`.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    auth: AuthUser,
    video_id: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Video>, AppError> {
    let Path(video_id) = video_id?;
    let mut multipart = multipart?;
    let video = state.pipeline.authorize(auth.user_id, video_id).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("thumbnail") {
            continue;
        }

        let accepted: Vec<&str> = ACCEPTED_THUMBNAIL_TYPES.iter().map(|(ty, _)| *ty).collect();
        let media_type = accept_content_type(field.content_type(), &accepted)?;
        let data = field.bytes().await?;

        let video = state.pipeline.upload_thumbnail(video, &media_type, data).await?;
        return Ok(Json(video));
    }

    Err(AppError::bad_request("Unable to parse form file"))
}
