//! VideoStore: video records persisted in SQLite.
//!
//! Upload handlers set their own URL column with `set_thumbnail_url` or
//! `set_video_url`, so a thumbnail and a video landing on the same record at
//! the same time do not overwrite each other.

use crate::models::video::Video;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const VIDEO_COLUMNS: &str = "id, user_id, title, description, thumbnail_url, video_url, \
                             created_at, updated_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone)]
pub struct VideoStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl VideoStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema, one statement at a time.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());

        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }

        Ok(())
    }

    /// Insert a fresh video with no assets attached.
    pub async fn create_video(
        &self,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> StoreResult<Video> {
        let now = Utc::now();
        let video = sqlx::query_as::<_, Video>(&format!(
            "INSERT INTO videos (id, user_id, title, description, thumbnail_url, video_url,
                                 created_at, updated_at)
             VALUES (?, ?, ?, ?, NULL, NULL, ?, ?)
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        debug!(video_id = %video.id, user_id = %user_id, "created video");
        Ok(video)
    }

    /// Look up a video. `None` when no row has this id.
    pub async fn get_video(&self, id: Uuid) -> StoreResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(video)
    }

    /// All videos owned by `user_id`, newest first.
    pub async fn list_videos_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(videos)
    }

    /// Persist the mutable fields of `video` and bump `updated_at` on it.
    ///
    /// Returns NotFound if the row disappeared since it was read.
    pub async fn update_video(&self, video: &mut Video) -> StoreResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE videos
             SET title = ?, description = ?, thumbnail_url = ?, video_url = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(now)
        .bind(video.id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(video.id));
        }

        video.updated_at = now;
        Ok(())
    }

    /// Point `thumbnail_url` at `url`, leaving every other column as stored.
    pub async fn set_thumbnail_url(&self, id: Uuid, url: &str) -> StoreResult<Video> {
        self.set_url_column("thumbnail_url", id, url).await
    }

    /// Point `video_url` at `url`, leaving every other column as stored.
    pub async fn set_video_url(&self, id: Uuid, url: &str) -> StoreResult<Video> {
        self.set_url_column("video_url", id, url).await
    }

    async fn set_url_column(&self, column: &'static str, id: Uuid, url: &str) -> StoreResult<Video> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "UPDATE videos SET {column} = ?, updated_at = ? WHERE id = ? RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(url)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        debug!(video_id = %id, column, "updated video url");
        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> VideoStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = VideoStore::new(Arc::new(pool));
        store.run_migrations().await.unwrap();
        store
    }

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let store = store().await;
        let owner = Uuid::new_v4();

        let created = store
            .create_video(owner, "Boots", Some("a pair of boots"))
            .await
            .unwrap();
        let fetched = store.get_video(created.id).await.unwrap().unwrap();

        assert_eq!(fetched.user_id, owner);
        assert_eq!(fetched.title, "Boots");
        assert_eq!(fetched.description.as_deref(), Some("a pair of boots"));
        assert!(fetched.thumbnail_url.is_none());
        assert!(fetched.video_url.is_none());
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let store = store().await;
        assert!(store.get_video(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_persists_urls() {
        let store = store().await;
        let mut video = store
            .create_video(Uuid::new_v4(), "clip", None)
            .await
            .unwrap();

        video.thumbnail_url = Some("http://localhost/assets/x.png".into());
        video.video_url = Some("https://cdn.example.com/landscape/x.mp4".into());
        store.update_video(&mut video).await.unwrap();

        let fetched = store.get_video(video.id).await.unwrap().unwrap();
        assert_eq!(fetched.thumbnail_url, video.thumbnail_url);
        assert_eq!(fetched.video_url, video.video_url);
        assert!(fetched.updated_at >= fetched.created_at);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = store().await;
        let mut video = store
            .create_video(Uuid::new_v4(), "clip", None)
            .await
            .unwrap();
        video.id = Uuid::new_v4();

        let err = store.update_video(&mut video).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == video.id));
    }

    #[tokio::test]
    async fn url_setters_keep_the_other_url() {
        let store = store().await;
        let video = store
            .create_video(Uuid::new_v4(), "clip", None)
            .await
            .unwrap();

        let after_video = store
            .set_video_url(video.id, "https://cdn.example.com/landscape/x.mp4")
            .await
            .unwrap();
        assert!(after_video.thumbnail_url.is_none());

        let after_thumb = store
            .set_thumbnail_url(video.id, "http://localhost/assets/x.png")
            .await
            .unwrap();
        assert_eq!(
            after_thumb.video_url.as_deref(),
            Some("https://cdn.example.com/landscape/x.mp4")
        );

        store
            .set_video_url(video.id, "https://cdn.example.com/portrait/x.mp4")
            .await
            .unwrap();
        let fetched = store.get_video(video.id).await.unwrap().unwrap();
        assert_eq!(
            fetched.thumbnail_url.as_deref(),
            Some("http://localhost/assets/x.png")
        );
        assert_eq!(
            fetched.video_url.as_deref(),
            Some("https://cdn.example.com/portrait/x.mp4")
        );
    }

    #[tokio::test]
    async fn url_setter_on_missing_row_is_not_found() {
        let store = store().await;
        let id = Uuid::new_v4();
        let err = store.set_thumbnail_url(id, "http://x").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn listing_is_scoped_to_owner() {
        let store = store().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.create_video(alice, "a1", None).await.unwrap();
        store.create_video(alice, "a2", None).await.unwrap();
        store.create_video(bob, "b1", None).await.unwrap();

        let videos = store.list_videos_for_user(alice).await.unwrap();
        assert_eq!(videos.len(), 2);
        assert!(videos.iter().all(|v| v.user_id == alice));
    }
}
