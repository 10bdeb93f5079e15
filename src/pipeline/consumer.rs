//! Batch persistence consumer.
//!
//! Messages in a batch are persisted strictly one after another. Each one
//! becomes a product write followed by a stock write under a freshly minted
//! id; between the two writes the product exists without stock. The first
//! failure aborts the batch, leaving the earlier messages persisted, and
//! the whole batch is redelivered. Redelivery mints new ids, so rows that
//! were already written are duplicated rather than overwritten.
//!
//! One notification is published after the last message succeeds. A failed
//! publish also fails the batch, which re-runs persistence on redelivery.

use crate::{
    config::PipelineConfig,
    errors::{PipelineError, PipelineResult},
    models::{
        catalog::{Product, Stock},
        message::InboundProductMessage,
        notification::BatchNotification,
    },
    services::{
        catalog_store::{CatalogStore, IdGenerator},
        notifier::Notifier,
        work_queue::QueueDelivery,
    },
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// One queue message as delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub message_id: String,
    pub body: String,
}

impl From<QueueDelivery> for BatchRecord {
    fn from(delivery: QueueDelivery) -> Self {
        Self {
            message_id: delivery.id,
            body: delivery.body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub product_ids: Vec<String>,
    pub notification_id: String,
}

pub struct CatalogBatchProcessor {
    catalog: Arc<dyn CatalogStore>,
    notifier: Arc<dyn Notifier>,
    ids: Arc<dyn IdGenerator>,
    topic: String,
    max_batch_size: usize,
}

impl CatalogBatchProcessor {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        notifier: Arc<dyn Notifier>,
        ids: Arc<dyn IdGenerator>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            catalog,
            notifier,
            ids,
            topic: config.topic_name.clone(),
            max_batch_size: config.batch_size,
        }
    }

    pub async fn process_batch(&self, records: &[BatchRecord]) -> PipelineResult<BatchReport> {
        let message_ids: Vec<&str> = records.iter().map(|r| r.message_id.as_str()).collect();
        info!("Processing batch of {} messages: {:?}", records.len(), message_ids);

        self.persist_and_notify(records)
            .await
            .inspect_err(|err| error!("Error processing batch {:?}: {}", message_ids, err))
    }

    async fn persist_and_notify(&self, records: &[BatchRecord]) -> PipelineResult<BatchReport> {
        if records.len() > self.max_batch_size {
            return Err(PipelineError::BatchTooLarge {
                size: records.len(),
                max: self.max_batch_size,
            });
        }

        let mut product_ids = Vec::with_capacity(records.len());
        for record in records {
            product_ids.push(self.persist_record(record).await?);
        }

        let notification = BatchNotification::for_topic(&self.topic);
        let notification_id = self
            .notifier
            .publish(&notification.topic, &notification.message, &notification.subject)
            .await?;
        info!("Successfully published notification {}", notification_id);

        Ok(BatchReport {
            product_ids,
            notification_id,
        })
    }

    /// Decode one message and write its product/stock pair. Returns the new id.
    async fn persist_record(&self, record: &BatchRecord) -> PipelineResult<String> {
        let message: InboundProductMessage =
            serde_json::from_str(&record.body).map_err(|source| PipelineError::Decode {
                message_id: record.message_id.clone(),
                source,
            })?;
        let field = |name: &'static str| {
            message
                .field_text(name)
                .ok_or_else(|| PipelineError::MissingField {
                    message_id: record.message_id.clone(),
                    field: name,
                })
        };

        let id = self.ids.next_id();
        let product = Product {
            id: id.clone(),
            title: field("title")?,
            description: field("description")?,
            price: field("price")?,
        };
        let stock = Stock {
            id: id.clone(),
            count: field("count")?,
        };

        self.catalog.put_product(&product).await?;
        debug!("Wrote product {} for message {}", id, record.message_id);
        self.catalog.put_stock(&stock).await?;

        info!("Inserted product and stock for productId: {}", id);
        Ok(id)
    }
}
