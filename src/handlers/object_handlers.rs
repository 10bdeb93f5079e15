//! Upload endpoint behind the signed URLs.
//! Streams the request body to storage without buffering it in memory; the
//! storage layer then announces the new object to the import trigger.

use crate::{
    errors::AppError,
    services::url_signer::{EXPIRES_PARAM, SIGNATURE_PARAM},
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::TryStreamExt;
use serde::Deserialize;
use std::io;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SignedUploadQuery {
    #[serde(rename = "X-Expires")]
    pub expires: Option<i64>,
    #[serde(rename = "X-Signature")]
    pub signature: Option<String>,
}

/// Upload an object to `/{bucket}/{*key}` using a URL from `GET /import`.
pub async fn upload_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<SignedUploadQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) else {
        return Err(AppError::forbidden("upload URL is not signed"));
    };
    if let Err(err) = state
        .signer
        .verify(&bucket, &key, expires, signature, Utc::now().timestamp())
    {
        warn!("Rejected upload to {}/{}: {}", bucket, key, err);
        return Err(AppError::forbidden(err.to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let stream = body.into_data_stream().map_err(io::Error::other);

    let object = state
        .storage
        .upload_object_stream(&bucket, &key, content_type, stream)
        .await?;
    info!("Stored {}/{} ({} bytes)", bucket, key, object.size_bytes);

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    if let Some(etag) = object.etag.as_ref() {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
            response.headers_mut().insert(header::ETAG, value);
        }
    }
    Ok(response)
}
