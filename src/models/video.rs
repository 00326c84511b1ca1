//! Represents a video metadata record and its media references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A video owned by a single user.
///
/// The record holds references to media, never the media bytes. `video_url`
/// and `thumbnail_url` contain either a fully-qualified URL or a raw
/// `<bucket>,<key>` pair, depending on the deployment's URL mode.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Video {
    /// Unique identifier of the record.
    pub id: Uuid,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,

    pub title: String,

    pub description: Option<String>,

    /// Owner. Only this user may change the record's media references.
    pub user_id: Uuid,

    /// Stored thumbnail reference, if any.
    pub thumbnail_url: Option<String>,

    /// Stored video reference, if any.
    pub video_url: Option<String>,
}

/// Payload accepted when creating a draft video record.
#[derive(Deserialize, Clone, Debug)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
}

impl Video {
    /// Build a fresh record with no media attached yet.
    pub fn draft(new: NewVideo, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: new.title,
            description: new.description,
            user_id,
            thumbnail_url: None,
            video_url: None,
        }
    }
}
