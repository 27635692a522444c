#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::Duration as TokenTtl;
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use vidhost::{
    config::AppConfig,
    models::video::Video,
    routes::routes,
    services::{
        auth,
        object_storage::{ObjectStorage, ObjectStorageError, ObjectStorageResult},
        video_store::VideoStore,
    },
    state::AppState,
};

pub const JWT_SECRET: &str = "integration-test-secret-long-enough";
pub const ASSETS_BASE_URL: &str = "http://localhost:8091/assets";
pub const OBJECT_BASE_URL: &str = "https://media.test";
pub const BOUNDARY: &str = "vidhost-test-boundary-7MA4YWxkTrZu0gW";

/// ffprobe stand-in that reports a 1920x1080 stream.
pub const PROBE_LANDSCAPE: &str = r#"echo '{"streams":[{"width":1920,"height":1080}]}'"#;
/// ffprobe stand-in that reports a 1080x1920 stream.
pub const PROBE_PORTRAIT: &str = r#"echo '{"streams":[{"width":1080,"height":1920}]}'"#;
/// Like `PROBE_LANDSCAPE`, but takes a second to answer.
pub const PROBE_SLOW_LANDSCAPE: &str =
    r#"sleep 1; echo '{"streams":[{"width":1920,"height":1080}]}'"#;
/// ffprobe stand-in that fails like a corrupt file would.
pub const PROBE_FAILS: &str = "echo 'Invalid data found when processing input' >&2; exit 1";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// In-memory bucket. Reads the spooled file while the handler still owns it.
#[derive(Default)]
pub struct MemoryObjectStorage {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_uploads: bool,
}

impl MemoryObjectStorage {
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put_object(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> ObjectStorageResult<()> {
        if self.fail_uploads {
            return Err(ObjectStorageError::UploadFailed {
                key: key.to_string(),
                reason: "bucket unavailable".into(),
            });
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ObjectStorageError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", OBJECT_BASE_URL, key)
    }
}

pub struct TestApp {
    pub router: Router,
    pub videos: VideoStore,
    pub objects: Arc<MemoryObjectStorage>,
    pub assets_dir: TempDir,
    pub tmp_dir: TempDir,
    _bin_dir: TempDir,
}

#[cfg(unix)]
fn write_fake_ffprobe(dir: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffprobe");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

impl TestApp {
    /// Build the full router over an in-memory database, temp directories,
    /// an in-memory bucket and a fake ffprobe running `probe_script`.
    pub async fn new(probe_script: &str) -> Self {
        Self::with_storage(probe_script, MemoryObjectStorage::default()).await
    }

    pub async fn with_storage(probe_script: &str, storage: MemoryObjectStorage) -> Self {
        let assets_dir = TempDir::new().unwrap();
        let tmp_dir = TempDir::new().unwrap();
        let bin_dir = TempDir::new().unwrap();
        let ffprobe_path = write_fake_ffprobe(bin_dir.path(), probe_script);

        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "sqlite::memory:".into(),
            jwt_secret: JWT_SECRET.into(),
            assets_root: assets_dir.path().to_path_buf(),
            assets_base_url: ASSETS_BASE_URL.into(),
            upload_tmp_dir: tmp_dir.path().to_path_buf(),
            s3_bucket: "test-bucket".into(),
            s3_region: "us-east-1".into(),
            s3_endpoint: None,
            s3_public_url: None,
            ffprobe_path,
            probe_timeout: Duration::from_secs(10),
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&config.database_url)
            .await
            .unwrap();
        let videos = VideoStore::new(Arc::new(pool));
        videos.run_migrations().await.unwrap();

        let objects = Arc::new(storage);
        let state = AppState::new(Arc::new(config), videos.clone(), objects.clone());

        Self {
            router: routes::app(state),
            videos,
            objects,
            assets_dir,
            tmp_dir,
            _bin_dir: bin_dir,
        }
    }

    pub async fn seed_video(&self, owner: Uuid) -> Video {
        self.videos
            .create_video(owner, "Test clip", Some("seeded by tests"))
            .await
            .unwrap()
    }

    pub async fn fetch_video(&self, id: Uuid) -> Video {
        self.videos.get_video(id).await.unwrap().unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn tmp_entries(&self) -> Vec<String> {
        dir_entries(self.tmp_dir.path())
    }

    pub fn asset_entries(&self) -> Vec<String> {
        dir_entries(self.assets_dir.path())
    }
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

pub fn token_for(user_id: Uuid) -> String {
    auth::make_jwt(user_id, JWT_SECRET, TokenTtl::hours(1)).unwrap()
}

/// A `multipart/form-data` body holding one file part.
pub fn multipart_body(
    field: &str,
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// `POST uri` with a multipart body and an optional bearer token.
pub fn upload_request(uri: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(uri: &str, token: Option<&str>, json: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(json.to_string())).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
