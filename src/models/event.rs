//! Storage-change notifications delivered to the CSV parser.

use serde::{Deserialize, Serialize};

/// Source tag stamped on events raised by the local object store.
pub const STORAGE_EVENT_SOURCE: &str = "catalog-import:storage";

pub const OBJECT_CREATED_PUT: &str = "ObjectCreated:Put";
pub const OBJECT_CREATED_COPY: &str = "ObjectCreated:Copy";
pub const OBJECT_REMOVED_DELETE: &str = "ObjectRemoved:Delete";

/// One storage-change record. A trigger delivers an ordered sequence of these.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageEvent {
    pub event_source: String,
    pub event_name: String,
    pub bucket: String,
    pub key: String,
}

impl StorageEvent {
    pub fn new(event_name: &str, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            event_source: STORAGE_EVENT_SOURCE.to_string(),
            event_name: event_name.to_string(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn is_object_created(&self) -> bool {
        self.event_name.starts_with("ObjectCreated:")
    }
}
