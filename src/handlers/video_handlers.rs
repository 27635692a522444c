//! HTTP handlers for video records and their uploaded assets.
//!
//! Every handler authenticates first, then loads the video and checks that
//! the caller owns it before reading any request body.

use crate::{
    errors::AppError,
    handlers::upload_form::{SpooledFile, read_file_field, spool_file_field},
    models::video::{NewVideo, Video},
    services::{
        assets::{allowed_thumbnail_types, media_type_essence, thumbnail_extension},
        auth,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        rejection::JsonRejection,
        multipart::MultipartRejection,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

pub const THUMBNAIL_FIELD: &str = "thumbnail";
pub const VIDEO_FIELD: &str = "video";

/// 10 MiB.
pub const MAX_THUMBNAIL_BYTES: u64 = 10 << 20;
/// 1 GiB.
pub const MAX_VIDEO_BYTES: u64 = 1 << 30;

const VIDEO_MEDIA_TYPE: &str = "video/mp4";

fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::bad_request(format!("invalid video id `{}`", raw)))
}

/// Load `video_id` and make sure `user_id` may modify it.
async fn load_owned_video(
    state: &AppState,
    video_id: Uuid,
    user_id: Uuid,
) -> Result<Video, AppError> {
    let video = state
        .videos
        .get_video(video_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("video `{}` not found", video_id)))?;

    if !video.is_owned_by(user_id) {
        warn!(video_id = %video_id, user_id = %user_id, "rejecting access to another user's video");
        return Err(AppError::forbidden("you do not own this video"));
    }

    Ok(video)
}

/// `POST /api/videos`: create an empty video owned by the caller.
pub async fn create_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewVideo>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = auth::authenticate(&headers, &state.config.jwt_secret)?;
    let Json(payload) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }

    let video = state
        .videos
        .create_video(user_id, title, payload.description.as_deref())
        .await?;
    info!(video_id = %video.id, user_id = %user_id, "video created");

    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos`: the caller's videos, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Video>>, AppError> {
    let user_id = auth::authenticate(&headers, &state.config.jwt_secret)?;
    let videos = state.videos.list_videos_for_user(user_id).await?;
    Ok(Json(videos))
}

/// `GET /api/videos/{video_id}`
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = auth::authenticate(&headers, &state.config.jwt_secret)?;
    let video = load_owned_video(&state, video_id, user_id).await?;
    Ok(Json(video))
}

/// `POST /api/thumbnail_upload/{video_id}`
///
/// Stores the `thumbnail` image as `{video_id}{ext}` under the assets root
/// and points the video's `thumbnail_url` at it.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = auth::authenticate(&headers, &state.config.jwt_secret)?;
    load_owned_video(&state, video_id, user_id).await?;
    let mut multipart = multipart.map_err(|e| AppError::bad_request(e.body_text()))?;

    let upload = read_file_field(&mut multipart, THUMBNAIL_FIELD, MAX_THUMBNAIL_BYTES).await?;

    let content_type = upload
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .ok_or_else(|| AppError::bad_request("thumbnail is missing a Content-Type"))?;
    let extension = thumbnail_extension(content_type).ok_or_else(|| {
        AppError::bad_request(format!(
            "unsupported thumbnail type `{}`; expected one of {}",
            content_type,
            allowed_thumbnail_types().collect::<Vec<_>>().join(", ")
        ))
    })?;

    let filename = format!("{}{}", video_id, extension);
    state.assets.write(&filename, &upload.bytes).await?;

    let video = state
        .videos
        .set_thumbnail_url(video_id, &state.assets.url_for(&filename))
        .await?;

    info!(
        video_id = %video_id,
        user_id = %user_id,
        size_bytes = upload.bytes.len(),
        file = %filename,
        "thumbnail uploaded"
    );
    Ok(Json(video))
}

/// `POST /api/video_upload/{video_id}`
///
/// Spools the `video` field to a temp file, classifies its aspect ratio,
/// uploads it to object storage as `{aspect}/{video_id}.mp4` and records the
/// object URL. The temp file is gone by the time this returns, on every path.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = auth::authenticate(&headers, &state.config.jwt_secret)?;
    load_owned_video(&state, video_id, user_id).await?;
    let mut multipart = multipart.map_err(|e| AppError::bad_request(e.body_text()))?;

    let SpooledFile {
        content_type,
        file,
        size_bytes,
    } = spool_file_field(
        &mut multipart,
        VIDEO_FIELD,
        MAX_VIDEO_BYTES,
        &state.config.upload_tmp_dir,
        &format!("{}-", video_id),
        ".mp4",
    )
    .await?;

    let media_type = content_type.as_deref().and_then(media_type_essence);
    if media_type.as_deref() != Some(VIDEO_MEDIA_TYPE) {
        return Err(AppError::bad_request(format!(
            "unsupported video type `{}`; expected {}",
            content_type.unwrap_or_default(),
            VIDEO_MEDIA_TYPE
        )));
    }

    let aspect = state.prober.aspect_ratio(file.path()).await?;
    let key = format!("{}/{}.mp4", aspect, video_id);
    state
        .objects
        .put_object(&key, file.path(), VIDEO_MEDIA_TYPE)
        .await?;

    if let Err(err) = file.close() {
        warn!(video_id = %video_id, error = %err, "could not remove spooled upload");
    }

    // A failure here leaves the uploaded object orphaned in the bucket.
    let video = state
        .videos
        .set_video_url(video_id, &state.objects.object_url(&key))
        .await?;

    info!(
        video_id = %video_id,
        user_id = %user_id,
        size_bytes,
        aspect_ratio = %aspect,
        key = %key,
        "video uploaded"
    );
    Ok(Json(video))
}
