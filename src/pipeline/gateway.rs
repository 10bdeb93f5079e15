//! Issues time-limited upload URLs scoped to the intake folder.
//!
//! Stateless and safe to re-invoke: each call signs a fresh URL and creates
//! no object. The object only appears once the client uploads to the URL.

use crate::{
    config::PipelineConfig,
    errors::{PipelineError, PipelineResult},
    services::{storage_service::StorageService, url_signer::UrlSigner},
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

pub const FILE_NAME_REQUIRED: &str = "fileName is required for importing products";
pub const FILE_NAME_INVALID: &str = "fileName is invalid";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadUrl {
    pub url: String,
}

pub struct UploadGateway {
    signer: Arc<dyn UrlSigner>,
    bucket: String,
    intake_folder: String,
    expires_in: Duration,
}

impl UploadGateway {
    pub fn new(signer: Arc<dyn UrlSigner>, config: &PipelineConfig) -> Self {
        Self {
            signer,
            bucket: config.bucket.clone(),
            intake_folder: config.intake_folder.clone(),
            expires_in: Duration::from_secs(config.url_expiry_secs),
        }
    }

    /// Bucket that upload URLs point at.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Sign a write URL for `{intake_folder}/{file_name}`.
    ///
    /// Input is validated before any signing happens.
    pub fn request_upload_url(&self, file_name: Option<&str>) -> PipelineResult<UploadUrl> {
        let file_name = match file_name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(PipelineError::Validation(FILE_NAME_REQUIRED.into())),
        };

        let key = format!("{}/{}", self.intake_folder, file_name);
        if StorageService::ensure_key_safe(&key).is_err() {
            return Err(PipelineError::Validation(FILE_NAME_INVALID.into()));
        }

        let url = self
            .signer
            .presign_put(&self.bucket, &key, self.expires_in)
            .inspect_err(|err| error!("Error generating signed URL for {}/{}: {}", self.bucket, key, err))?;

        info!("Issued upload URL for {}/{}", self.bucket, key);
        Ok(UploadUrl { url })
    }
}
