//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks SQLite, the temp dir and the media tools

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Liveness probe. Always returns 200 OK and never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Runs `SELECT 1` against SQLite.
/// 2. Writes, reads and deletes a file in the pipeline's temp dir.
/// 3. Resolves each media tool binary.
///
/// HTTP 200 when all checks pass, HTTP 503 when any check fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = HashMap::new();

    let sqlite_check = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.db)
        .await
    {
        Ok(1) => CheckStatus::ok(),
        Ok(v) => CheckStatus::failed(format!("unexpected result: {}", v)),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    };
    checks.insert("sqlite".to_string(), sqlite_check);

    let tmp_path = state
        .pipeline
        .config()
        .temp_dir
        .join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => {
            let read = fs::read(&tmp_path).await;
            let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
            match read {
                Ok(bytes) if bytes == b"readyz" => CheckStatus::ok(),
                Ok(_) => CheckStatus::failed("file content mismatch"),
                Err(e) => CheckStatus::failed(format!("could not read tmp file: {}", e)),
            }
        }
        Err(e) => CheckStatus::failed(format!("could not write tmp file: {}", e)),
    };
    checks.insert("temp_dir".to_string(), disk_check);

    for tool in state.tools.iter() {
        let check = match which::which(tool) {
            Ok(_) => CheckStatus::ok(),
            Err(e) => CheckStatus::failed(format!("{}: {}", tool.display(), e)),
        };
        checks.insert(tool.to_string_lossy().into_owned(), check);
    }

    let overall_ok = checks.values().all(|check| check.ok);
    let body = ReadyResponse {
        status: if overall_ok { "ok".into() } else { "error".into() },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<String, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}
