//! Notification fanout: records each published message and broadcasts it
//! to in-process subscribers. Publishing is never retried here.

use crate::{
    errors::{PipelineError, PipelineResult},
    models::notification::PublishedNotification,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const SUBSCRIBER_CAPACITY: usize = 64;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish `message` to `topic`, returning the message id.
    async fn publish(&self, topic: &str, message: &str, subject: &str) -> PipelineResult<String>;
}

#[derive(Clone)]
pub struct SqliteNotifier {
    db: Arc<SqlitePool>,
    subscribers: broadcast::Sender<PublishedNotification>,
}

impl SqliteNotifier {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        let (subscribers, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self { db, subscribers }
    }

    /// Receive every notification published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedNotification> {
        self.subscribers.subscribe()
    }

    /// Notifications recorded for `topic`, oldest first.
    pub async fn published(&self, topic: &str) -> PipelineResult<Vec<PublishedNotification>> {
        sqlx::query_as::<_, PublishedNotification>(
            "SELECT id, topic, subject, message, published_at
             FROM notifications WHERE topic = ? ORDER BY published_at ASC",
        )
        .bind(topic)
        .fetch_all(&*self.db)
        .await
        .map_err(|err| PipelineError::infrastructure("list notifications", err))
    }
}

#[async_trait]
impl Notifier for SqliteNotifier {
    async fn publish(&self, topic: &str, message: &str, subject: &str) -> PipelineResult<String> {
        let notification = PublishedNotification {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
            published_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO notifications (id, topic, subject, message, published_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(notification.id)
        .bind(&notification.topic)
        .bind(&notification.subject)
        .bind(&notification.message)
        .bind(notification.published_at)
        .execute(&*self.db)
        .await
        .map_err(|err| PipelineError::infrastructure("publish notification", err))?;

        let id = notification.id.to_string();
        // No live subscribers is fine; the record above is the durable copy.
        if self.subscribers.send(notification).is_err() {
            debug!("no subscribers for topic {}", topic);
        }
        Ok(id)
    }
}
