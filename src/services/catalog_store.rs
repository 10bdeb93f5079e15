//! Product and stock persistence.
//!
//! The two tables are written independently; nothing here makes a
//! product/stock pair atomic.

use crate::{
    errors::{PipelineError, PipelineResult},
    models::catalog::{Product, Stock},
};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Write a product, replacing any record with the same id.
    async fn put_product(&self, product: &Product) -> PipelineResult<()>;

    /// Write a stock record, replacing any record with the same id.
    async fn put_stock(&self, stock: &Stock) -> PipelineResult<()>;
}

/// Source of record ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs; every call yields a new id.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[derive(Clone)]
pub struct SqliteCatalogStore {
    db: Arc<SqlitePool>,
    product_table: String,
    stock_table: String,
}

impl SqliteCatalogStore {
    /// Table names are interpolated into SQL, so only plain identifiers pass.
    pub fn new(
        db: Arc<SqlitePool>,
        product_table: impl Into<String>,
        stock_table: impl Into<String>,
    ) -> PipelineResult<Self> {
        let product_table = product_table.into();
        let stock_table = stock_table.into();
        for table in [&product_table, &stock_table] {
            if !is_plain_identifier(table) {
                return Err(PipelineError::Validation(format!(
                    "table name `{}` is not a plain identifier",
                    table
                )));
            }
        }
        if product_table == stock_table {
            return Err(PipelineError::Validation(
                "product and stock tables must differ".into(),
            ));
        }
        Ok(Self {
            db,
            product_table,
            stock_table,
        })
    }

    /// Create both tables when missing. Every column is TEXT.
    pub async fn ensure_tables(&self) -> PipelineResult<()> {
        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    price TEXT NOT NULL
                )",
                self.product_table
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    count TEXT NOT NULL
                )",
                self.stock_table
            ),
        ];
        for stmt in &statements {
            sqlx::query(stmt)
                .execute(&*self.db)
                .await
                .map_err(|err| PipelineError::infrastructure("create catalog tables", err))?;
        }
        Ok(())
    }

    pub async fn products(&self) -> PipelineResult<Vec<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT id, title, description, price FROM {} ORDER BY rowid",
            self.product_table
        ))
        .fetch_all(&*self.db)
        .await
        .map_err(|err| PipelineError::infrastructure("list products", err))
    }

    pub async fn stocks(&self) -> PipelineResult<Vec<Stock>> {
        sqlx::query_as::<_, Stock>(&format!(
            "SELECT id, count FROM {} ORDER BY rowid",
            self.stock_table
        ))
        .fetch_all(&*self.db)
        .await
        .map_err(|err| PipelineError::infrastructure("list stocks", err))
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn put_product(&self, product: &Product) -> PipelineResult<()> {
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO {} (id, title, description, price) VALUES (?, ?, ?, ?)",
            self.product_table
        ))
        .bind(&product.id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.price)
        .execute(&*self.db)
        .await
        .map_err(|err| PipelineError::infrastructure("put product", err))?;
        Ok(())
    }

    async fn put_stock(&self, stock: &Stock) -> PipelineResult<()> {
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO {} (id, count) VALUES (?, ?)",
            self.stock_table
        ))
        .bind(&stock.id)
        .bind(&stock.count)
        .execute(&*self.db)
        .await
        .map_err(|err| PipelineError::infrastructure("put stock", err))?;
        Ok(())
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
