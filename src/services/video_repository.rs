//! Video metadata store backed by SQLite.
//!
//! The upload pipeline only depends on the [`VideoRepository`] trait so it can
//! run against an in-memory fake in tests.

use crate::models::video::{NewVideo, Video};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Lookup and write-back of video records.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Fetch a record by id. Unknown ids yield [`RepositoryError::NotFound`].
    async fn get_video(&self, id: Uuid) -> RepositoryResult<Video>;

    /// Overwrite a record's mutable columns. The record must already exist.
    async fn update_video(&self, video: &Video) -> RepositoryResult<()>;

    /// Insert a new draft record owned by `user_id`.
    async fn create_video(&self, new: NewVideo, user_id: Uuid) -> RepositoryResult<Video>;
}

#[derive(Clone)]
pub struct SqliteVideoRepository {
    db: Arc<SqlitePool>,
}

impl SqliteVideoRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoRepository for SqliteVideoRepository {
    async fn get_video(&self, id: Uuid) -> RepositoryResult<Video> {
        sqlx::query_as::<_, Video>(
            "SELECT id, created_at, updated_at, title, description, user_id,
                    thumbnail_url, video_url
             FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound(id),
            other => RepositoryError::Sqlx(other),
        })
    }

    async fn update_video(&self, video: &Video) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE videos
             SET title = ?, description = ?, thumbnail_url = ?, video_url = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.updated_at)
        .bind(video.id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(video.id));
        }

        debug!(video_id = %video.id, "updated video record");
        Ok(())
    }

    async fn create_video(&self, new: NewVideo, user_id: Uuid) -> RepositoryResult<Video> {
        let video = Video::draft(new, user_id);

        sqlx::query(
            "INSERT INTO videos (id, created_at, updated_at, title, description, user_id,
                                 thumbnail_url, video_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(video.id)
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.user_id)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .execute(&*self.db)
        .await?;

        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn repository() -> SqliteVideoRepository {
        let pool = db::connect_in_memory().await.unwrap();
        SqliteVideoRepository::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn create_then_get_returns_same_record() {
        let repo = repository().await;
        let owner = Uuid::new_v4();
        let created = repo
            .create_video(
                NewVideo {
                    title: "boots".into(),
                    description: Some("first upload".into()),
                },
                owner,
            )
            .await
            .unwrap();

        let fetched = repo.get_video(created.id).await.unwrap();
        assert_eq!(fetched.user_id, owner);
        assert_eq!(fetched.title, "boots");
        assert!(fetched.video_url.is_none());
    }

    #[tokio::test]
    async fn update_persists_media_reference() {
        let repo = repository().await;
        let mut video = repo
            .create_video(
                NewVideo {
                    title: "clip".into(),
                    description: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        video.video_url = Some("media-bucket,portrait/abc.mp4".into());
        repo.update_video(&video).await.unwrap();

        let fetched = repo.get_video(video.id).await.unwrap();
        assert_eq!(
            fetched.video_url.as_deref(),
            Some("media-bucket,portrait/abc.mp4")
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let repo = repository().await;
        let id = Uuid::new_v4();
        assert!(matches!(
            repo.get_video(id).await,
            Err(RepositoryError::NotFound(missing)) if missing == id
        ));
    }
}
