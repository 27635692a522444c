//! Represents a video record and the asset URLs attached to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A video owned by a single user.
///
/// The upload handlers only ever touch `thumbnail_url` and `video_url`, and
/// only when the caller is the owner.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Video {
    /// Unique identifier for this video.
    pub id: Uuid,

    /// ID of the user who owns this video.
    pub user_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    /// Locally served thumbnail, set by the thumbnail upload.
    pub thumbnail_url: Option<String>,

    /// Object-storage URL of the video file, set by the video upload.
    pub video_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Body of `POST /api/videos`.
#[derive(Debug, Deserialize)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
}
