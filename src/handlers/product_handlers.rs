//! `POST /products`: create a single product with its stock.

use crate::{
    errors::AppError,
    pipeline::products::{CreatedProduct, NewProduct},
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<NewProduct>,
) -> Result<(StatusCode, Json<CreatedProduct>), AppError> {
    info!("Incoming request to POST /products with params: {:?}", payload);
    let created = state.products.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
