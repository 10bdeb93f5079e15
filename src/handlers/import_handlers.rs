//! `GET /import`: hands out a signed upload URL for a CSV file.

use crate::{errors::AppError, pipeline::gateway::UploadUrl, state::AppState};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

/// Respond with `{"url": ...}`, or 400 when `fileName` is missing or empty.
pub async fn import_products_file(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
) -> Result<Json<UploadUrl>, AppError> {
    let upload = state
        .gateway
        .request_upload_url(query.file_name.as_deref())?;
    Ok(Json(upload))
}
