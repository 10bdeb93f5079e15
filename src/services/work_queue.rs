//! Durable, at-least-once work queue backed by SQLite.
//!
//! Messages are claimed in send order and hidden for a visibility timeout.
//! A claimed message that is not acknowledged before the timeout elapses
//! becomes visible again and is redelivered.

use crate::errors::{PipelineError, PipelineResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{sync::Arc, time::Duration};
use tracing::debug;
use uuid::Uuid;

/// The send side the CSV parser depends on.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Durably enqueue `body`, returning the assigned message id.
    async fn send(&self, body: String) -> PipelineResult<String>;
}

/// A message handed to a consumer. `receive_count` starts at 1.
#[derive(Debug, Clone, FromRow)]
pub struct QueueDelivery {
    pub seq: i64,
    pub id: String,
    pub body: String,
    pub receive_count: i64,
}

#[derive(Clone)]
pub struct SqliteWorkQueue {
    db: Arc<SqlitePool>,
    queue_name: String,
    visibility_timeout: Duration,
}

impl SqliteWorkQueue {
    pub fn new(db: Arc<SqlitePool>, queue_name: impl Into<String>, visibility_timeout: Duration) -> Self {
        Self {
            db,
            queue_name: queue_name.into(),
            visibility_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.queue_name
    }

    /// Claim up to `max` visible messages, oldest first.
    ///
    /// The claim is a single UPDATE so concurrent receivers never share a message.
    pub async fn receive_batch(&self, max: usize) -> PipelineResult<Vec<QueueDelivery>> {
        let now = Utc::now().timestamp_millis();
        let hidden_until = now + self.visibility_timeout.as_millis() as i64;

        let mut claimed = sqlx::query_as::<_, QueueDelivery>(
            r#"
            UPDATE queue_messages
            SET visible_at = ?, receive_count = receive_count + 1
            WHERE seq IN (
                SELECT seq FROM queue_messages
                WHERE queue_name = ? AND visible_at <= ?
                ORDER BY seq ASC
                LIMIT ?
            )
            RETURNING seq, id, body, receive_count
            "#,
        )
        .bind(hidden_until)
        .bind(&self.queue_name)
        .bind(now)
        .bind(max as i64)
        .fetch_all(&*self.db)
        .await
        .map_err(|err| PipelineError::infrastructure("receive from queue", err))?;

        claimed.sort_by_key(|delivery| delivery.seq);
        if !claimed.is_empty() {
            debug!("claimed {} messages from {}", claimed.len(), self.queue_name);
        }
        Ok(claimed)
    }

    /// Delete acknowledged messages. Unknown ids are ignored.
    pub async fn ack(&self, ids: &[String]) -> PipelineResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("DELETE FROM queue_messages WHERE queue_name = ");
        builder.push_bind(&self.queue_name);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        builder
            .build()
            .execute(&*self.db)
            .await
            .map_err(|err| PipelineError::infrastructure("ack queue messages", err))?;
        Ok(())
    }

    /// Number of messages not yet acknowledged, visible or in flight.
    pub async fn depth(&self) -> PipelineResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM queue_messages WHERE queue_name = ?")
            .bind(&self.queue_name)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| PipelineError::infrastructure("count queue messages", err))
    }
}

#[async_trait]
impl WorkQueue for SqliteWorkQueue {
    async fn send(&self, body: String) -> PipelineResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO queue_messages (id, queue_name, body, sent_at, visible_at, receive_count)
             VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(&id)
        .bind(&self.queue_name)
        .bind(&body)
        .bind(now)
        .bind(now.timestamp_millis())
        .execute(&*self.db)
        .await
        .map_err(|err| PipelineError::infrastructure("send to queue", err))?;

        Ok(id)
    }
}
