//! Represents an object (file) stored in a bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents a single object (blob) within a bucket.
///
/// The `Object` struct stores its metadata, not the actual content bytes.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Object {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Foreign key linking to the parent bucket.
    pub bucket_id: Uuid,

    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Last path segment of the key.
    pub filename: String,

    /// Content type (MIME type).
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload.
    pub etag: Option<String>,

    /// Timestamp when object was last written.
    pub last_modified: DateTime<Utc>,
}

/// Lifecycle position of an uploaded file, derived from its key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectState {
    /// Uploaded and waiting to be parsed.
    Intake,
    /// Parsed, enqueued and moved out of the intake folder.
    Parsed,
}

impl ObjectState {
    /// Classify `key` by prefix. Keys outside both folders have no state.
    ///
    /// The parsed prefix wins when both match, so an object that has already
    /// been moved is never mistaken for a fresh upload.
    pub fn from_key(key: &str, intake_prefix: &str, parsed_prefix: &str) -> Option<Self> {
        if key.starts_with(parsed_prefix) {
            Some(Self::Parsed)
        } else if key.starts_with(intake_prefix) {
            Some(Self::Intake)
        } else {
            None
        }
    }
}

/// Compute the key an intake object moves to once parsed.
///
/// Only the leading intake prefix is replaced, so a folder name repeated
/// deeper in the key is left alone. Returns `None` for keys outside intake.
pub fn parsed_key(key: &str, intake_prefix: &str, parsed_prefix: &str) -> Option<String> {
    key.strip_prefix(intake_prefix)
        .map(|rest| format!("{}{}", parsed_prefix, rest))
}
