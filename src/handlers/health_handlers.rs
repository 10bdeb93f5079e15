//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness ("ok")
//! - GET /readyz   -> database, payload directory and import bucket checks

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// Returns 200 when every check passes and 503 otherwise, with the result of
/// each check in the body.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert("sqlite", sqlite_check(&state).await);
    checks.insert("disk", disk_check(&state).await);
    checks.insert("bucket", bucket_check(&state).await);

    let ready = checks.values().all(|c| c.ok);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            status: if ready { "ok" } else { "error" },
            checks,
        }),
    )
}

async fn sqlite_check(state: &AppState) -> CheckStatus {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.storage.db)
        .await
    {
        Ok(1) => CheckStatus::passed(),
        Ok(v) => CheckStatus::failed(format!("unexpected result: {}", v)),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    }
}

/// Write, read back and remove a scratch file under the payload directory.
async fn disk_check(state: &AppState) -> CheckStatus {
    let scratch = state
        .storage
        .base_path
        .join(format!(".readyz-{}", Uuid::new_v4()));
    if let Err(e) = fs::write(&scratch, b"readyz").await {
        return CheckStatus::failed(format!("could not write scratch file: {}", e));
    }
    let result = match fs::read(&scratch).await {
        Ok(bytes) if bytes == b"readyz" => CheckStatus::passed(),
        Ok(_) => CheckStatus::failed("scratch file content mismatch".to_string()),
        Err(e) => CheckStatus::failed(format!("could not read scratch file: {}", e)),
    };
    let _ = fs::remove_file(&scratch).await;
    result
}

async fn bucket_check(state: &AppState) -> CheckStatus {
    match state.storage.bucket_exists(state.gateway.bucket()).await {
        Ok(true) => CheckStatus::passed(),
        Ok(false) => CheckStatus::failed(format!("bucket `{}` missing", state.gateway.bucket())),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    }
}

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
    fn passed() -> Self {
        Self { ok: true, error: None }
    }

    fn failed(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }
}
