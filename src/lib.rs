//! CSV catalog import pipeline: signed upload URLs, a local object store
//! that announces writes, a CSV fan-out parser, a work queue and a batch
//! consumer that persists products and stock and publishes a notification.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;
pub mod state;
