//! The import pipeline stages.
//!
//! Every stage is safe to re-invoke in full: a failed invocation is retried
//! from scratch by whatever delivered it, never resumed mid-way.
//!
//! - `gateway` issues upload URLs scoped to the intake folder.
//! - `parser` turns an uploaded CSV into one queue message per row.
//! - `consumer` persists queued rows in batches and signals completion.
//! - `products` creates a single product outside the import.
//! - `runner` stands in for the trigger and queue infrastructure.

pub mod consumer;
pub mod filter;
pub mod gateway;
pub mod parser;
pub mod products;
pub mod runner;
