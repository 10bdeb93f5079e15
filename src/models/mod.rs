//! Core data models for the catalog import pipeline.
//!
//! Buckets and objects describe the local object store and map to SQLite
//! rows via `sqlx::FromRow`. Events, queue messages, catalog records and
//! notifications are the values flowing between pipeline stages and
//! serialize as JSON via `serde`.

pub mod bucket;
pub mod catalog;
pub mod event;
pub mod message;
pub mod notification;
pub mod object;
