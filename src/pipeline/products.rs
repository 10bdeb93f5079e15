//! Single product creation outside the CSV import.
//!
//! Writes the same product/stock pair the batch consumer writes, under one
//! freshly minted id, with the same non-atomic product-then-stock order.

use crate::{
    errors::{PipelineError, PipelineResult},
    models::{
        catalog::{Product, Stock},
        message::value_text,
    },
    services::catalog_store::{CatalogStore, IdGenerator},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const MISSING_PRODUCT_DATA: &str = "There is some missing data in payload.";

/// Request payload. Values may be JSON strings or numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProduct {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub count: Option<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreatedProduct {
    pub id: String,
}

pub struct ProductCreator {
    catalog: Arc<dyn CatalogStore>,
    ids: Arc<dyn IdGenerator>,
}

impl ProductCreator {
    pub fn new(catalog: Arc<dyn CatalogStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { catalog, ids }
    }

    /// Validate, then write the product followed by its stock.
    ///
    /// `title`, `price` and `count` must be present and non-blank; zero and
    /// `false` count as blank. A missing description is stored empty.
    pub async fn create(&self, payload: &NewProduct) -> PipelineResult<CreatedProduct> {
        let (Some(title), Some(price), Some(count)) = (
            required_text(payload.title.as_ref()),
            required_text(payload.price.as_ref()),
            required_text(payload.count.as_ref()),
        ) else {
            return Err(PipelineError::Validation(MISSING_PRODUCT_DATA.into()));
        };
        let description = payload
            .description
            .as_ref()
            .and_then(value_text)
            .unwrap_or_default();

        let id = self.ids.next_id();
        self.catalog
            .put_product(&Product {
                id: id.clone(),
                title,
                description,
                price,
            })
            .await?;
        self.catalog
            .put_stock(&Stock {
                id: id.clone(),
                count,
            })
            .await?;

        info!("Created product {}", id);
        Ok(CreatedProduct { id })
    }
}

fn required_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => value_text(other),
    }
}
