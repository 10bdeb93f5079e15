//! HTTP surface of the import service.
//!
//! - `GET /healthz`, `GET /readyz` probes
//! - `GET /import?fileName=...` issues a signed upload URL
//! - `PUT /{bucket}/{*key}` accepts an upload against such a URL
//! - `POST /products` creates a single product with its stock
//!
//! The wildcard `*key` allows nested keys like `uploaded/products.csv`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        import_handlers::import_products_file,
        object_handlers::upload_object,
        product_handlers::create_product,
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/import", get(import_products_file))
        .route("/products", post(create_product))
        .route("/{bucket}/{*key}", put(upload_object))
}
