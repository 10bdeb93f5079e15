//! Catalog records persisted by the batch consumer.
//!
//! Product and stock rows share `id` as the join key. Every column is text at
//! rest; prices and counts are stored exactly as they appeared in the CSV.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: String,
}

#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Stock {
    pub id: String,
    pub count: String,
}
