//! Shared state handed to every HTTP handler.

use crate::{
    pipeline::{gateway::UploadGateway, products::ProductCreator},
    services::{storage_service::StorageService, url_signer::HmacUrlSigner},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub storage: StorageService,
    pub gateway: Arc<UploadGateway>,
    pub products: Arc<ProductCreator>,
    /// Verifies signatures on incoming uploads.
    pub signer: Arc<HmacUrlSigner>,
}
