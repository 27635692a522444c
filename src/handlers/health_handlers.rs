//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the database and the assets dir

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn from_result(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                error: None,
            },
            Err(error) => Self {
                ok: false,
                error: Some(error),
            },
        }
    }
}

/// `GET /healthz`
///
/// Liveness only; never touches I/O.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// 200 when SQLite answers `SELECT 1` and a scratch file can be written,
/// read back and removed under the assets root; 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert("sqlite", CheckStatus::from_result(check_database(&state).await));
    checks.insert("assets", CheckStatus::from_result(check_assets_dir(&state).await));

    let ready = checks.values().all(|c| c.ok);
    let (status, label) = if ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "error")
    };

    (
        status,
        Json(ReadyResponse {
            status: label,
            checks,
        }),
    )
}

async fn check_database(state: &AppState) -> Result<(), String> {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.videos.db)
        .await
    {
        Ok(1) => Ok(()),
        Ok(v) => Err(format!("unexpected result: {}", v)),
        Err(e) => Err(format!("error: {}", e)),
    }
}

async fn check_assets_dir(state: &AppState) -> Result<(), String> {
    let probe = state.assets.root.join(format!(".readyz-{}", Uuid::new_v4()));

    fs::write(&probe, b"readyz")
        .await
        .map_err(|e| format!("could not write scratch file: {}", e))?;

    let result = match fs::read(&probe).await {
        Ok(bytes) if bytes == b"readyz" => Ok(()),
        Ok(_) => Err("scratch file content mismatch".to_string()),
        Err(e) => Err(format!("could not read scratch file: {}", e)),
    };

    // Best-effort cleanup; only reported when everything else passed.
    match (fs::remove_file(&probe).await, result) {
        (Err(e), Ok(())) => Err(format!("could not remove scratch file: {}", e)),
        (_, result) => result,
    }
}
