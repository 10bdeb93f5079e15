//! Time-limited, key-scoped upload URLs.
//!
//! A signed URL looks like
//! `{base}/{bucket}/{key}?X-Expires={unix}&X-Signature={hex}` where the
//! signature is HMAC-SHA256 over `PUT\n{bucket}\n{key}\n{expires}`. The
//! signature binds the exact key, so the URL grants nothing beyond it.

use crate::errors::{PipelineError, PipelineResult};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const EXPIRES_PARAM: &str = "X-Expires";
pub const SIGNATURE_PARAM: &str = "X-Signature";

/// Issues write URLs. Kept behind a trait so the gateway can be tested with
/// a recording fake.
pub trait UrlSigner: Send + Sync {
    fn presign_put(&self, bucket: &str, key: &str, expires_in: Duration) -> PipelineResult<String>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("upload URL has expired")]
    Expired,
    #[error("upload URL signature does not match")]
    Mismatch,
}

#[derive(Clone)]
pub struct HmacUrlSigner {
    secret: Vec<u8>,
    base_url: Url,
}

impl HmacUrlSigner {
    pub fn new(secret: impl AsRef<[u8]>, base_url: &str) -> PipelineResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| PipelineError::infrastructure("parse public base url", err))?;
        if base_url.cannot_be_a_base() {
            return Err(PipelineError::infrastructure(
                "parse public base url",
                format!("`{}` cannot carry a path", base_url),
            ));
        }
        Ok(Self {
            secret: secret.as_ref().to_vec(),
            base_url,
        })
    }

    fn mac(&self, bucket: &str, key: &str, expires: i64) -> PipelineResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| PipelineError::infrastructure("initialize url signer", err.to_string()))?;
        mac.update(format!("PUT\n{}\n{}\n{}", bucket, key, expires).as_bytes());
        Ok(mac)
    }

    /// Signature for the given request, hex encoded.
    pub fn sign(&self, bucket: &str, key: &str, expires: i64) -> PipelineResult<String> {
        Ok(hex::encode(self.mac(bucket, key, expires)?.finalize().into_bytes()))
    }

    /// Check a presented signature for `bucket`/`key` at time `now` (unix seconds).
    pub fn verify(
        &self,
        bucket: &str,
        key: &str,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        if now > expires {
            return Err(SignatureError::Expired);
        }
        let presented = hex::decode(signature).map_err(|_| SignatureError::Mismatch)?;
        self.mac(bucket, key, expires)
            .map_err(|_| SignatureError::Mismatch)?
            .verify_slice(&presented)
            .map_err(|_| SignatureError::Mismatch)
    }
}

impl UrlSigner for HmacUrlSigner {
    fn presign_put(&self, bucket: &str, key: &str, expires_in: Duration) -> PipelineResult<String> {
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        let signature = self.sign(bucket, key, expires)?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::infrastructure("sign upload url", "base url cannot carry a path"))?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        url.query_pairs_mut()
            .append_pair(EXPIRES_PARAM, &expires.to_string())
            .append_pair(SIGNATURE_PARAM, &signature);
        Ok(url.into())
    }
}
