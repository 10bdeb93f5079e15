//! Completion signal published once per successfully persisted batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const BATCH_NOTIFICATION_SUBJECT: &str = "Create Product Event Notification";
pub const BATCH_NOTIFICATION_MESSAGE: &str =
    "Products from CSV file successfully imported in DynamoDB";

/// The fixed notification a consumer publishes after a full batch succeeds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BatchNotification {
    pub topic: String,
    pub subject: String,
    pub message: String,
}

impl BatchNotification {
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subject: BATCH_NOTIFICATION_SUBJECT.to_string(),
            message: BATCH_NOTIFICATION_MESSAGE.to_string(),
        }
    }
}

/// A notification as recorded by the fanout, with its assigned id.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct PublishedNotification {
    pub id: Uuid,
    pub topic: String,
    pub subject: String,
    pub message: String,
    pub published_at: DateTime<Utc>,
}
