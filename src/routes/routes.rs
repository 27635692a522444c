//! Defines routes for the video upload API.
//!
//! ## Structure
//! - **Probes**
//!   - `GET  /healthz`, `GET /readyz`
//!
//! - **Video records**
//!   - `POST /api/videos`: create a video owned by the caller
//!   - `GET  /api/videos`: list the caller's videos
//!   - `GET  /api/videos/{video_id}`: fetch one video
//!
//! - **Uploads** (multipart)
//!   - `POST /api/thumbnail_upload/{video_id}`: field `thumbnail`, stored locally
//!   - `POST /api/video_upload/{video_id}`: field `video`, stored in the bucket
//!
//! - **Assets**
//!   - `GET  /assets/{*file}`: files under the configured assets root

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{
            MAX_THUMBNAIL_BYTES, MAX_VIDEO_BYTES, create_video, get_video, list_videos,
            upload_thumbnail, upload_video,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::path::Path;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

fn body_limit(max_file_bytes: u64) -> DefaultBodyLimit {
    let limit = max_file_bytes + MULTIPART_OVERHEAD_BYTES;
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Build the router for all API routes plus static assets under `assets_root`.
pub fn routes(assets_root: &Path) -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/videos", post(create_video).get(list_videos))
        .route("/api/videos/{video_id}", get(get_video))
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload_thumbnail).layer(body_limit(MAX_THUMBNAIL_BYTES)),
        )
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(body_limit(MAX_VIDEO_BYTES)),
        )
        .nest_service("/assets", ServeDir::new(assets_root))
}

/// The complete application with state attached and request tracing enabled.
pub fn app(state: AppState) -> Router {
    let assets_root = state.config.assets_root.clone();
    routes(&assets_root)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
