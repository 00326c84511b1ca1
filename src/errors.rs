use crate::services::{
    auth::AuthError, upload_pipeline::UploadError, video_repository::RepositoryError,
};
use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
///
/// Only `message` reaches the caller. Anything more detailed (tool stderr,
/// SDK error text) is logged where the error is converted.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for 401 Unauthorized
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    /// Shortcut for 403 Forbidden
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let summary = match &err {
            UploadError::BadRequest(msg) => return AppError::bad_request(msg.clone()),
            UploadError::Forbidden => {
                return AppError::forbidden("User is not the owner of the video");
            }
            UploadError::NotFound(_) => {
                return AppError::not_found("No video corresponding to videoID");
            }
            UploadError::Staging(io) => {
                // Body stream failures arrive wrapped in the io error.
                if let Some(multipart) = io.get_ref().and_then(|e| e.downcast_ref::<MultipartError>()) {
                    return multipart_rejection(multipart.status());
                }
                "Error when writing temp video file"
            }
            UploadError::Processing(_) => "Error when processing video",
            UploadError::StoreUpload(_) => "Error when sending file to object storage",
            UploadError::Signing(_) => "Error when signing video URL",
            UploadError::Persistence(_) => "Error when updating video",
            UploadError::Lookup(_) => "Error when fetching video",
        };

        tracing::error!(error = ?err, "{}", summary);
        AppError::internal(summary)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(error = %err, "rejecting request");
        match err {
            AuthError::MissingBearer | AuthError::MalformedHeader => {
                AppError::unauthorized("Couldn't find JWT")
            }
            _ => AppError::unauthorized("Couldn't validate JWT"),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => AppError::not_found("No video corresponding to videoID"),
            other => {
                tracing::error!(error = ?other, "metadata store failure");
                AppError::internal("Error when accessing video metadata")
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        tracing::debug!(error = %err, "multipart parse failure");
        multipart_rejection(err.status())
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        tracing::debug!(error = %err, "rejecting path parameters");
        AppError::bad_request("Invalid ID")
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        tracing::debug!(error = %err, "rejecting JSON body");
        AppError::new(err.status(), "Couldn't decode parameters")
    }
}

impl From<MultipartRejection> for AppError {
    fn from(err: MultipartRejection) -> Self {
        tracing::debug!(error = %err, "rejecting multipart request");
        AppError::bad_request("Unable to parse form file")
    }
}

fn multipart_rejection(status: StatusCode) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(status, "Upload exceeds the size limit")
    } else {
        AppError::bad_request("Unable to parse form file")
    }
}
