//! Local stand-ins for the trigger and queue infrastructure.
//!
//! `TriggerRunner` feeds storage-change events to the parser and redelivers
//! failed invocations a bounded number of times. `QueuePoller` claims
//! batches from the work queue, hands them to the consumer and acks only on
//! success; anything else is redelivered by the queue's visibility timeout.
//! Every invocation runs under a time budget and overrunning it is a failure.

use crate::{
    config::PipelineConfig,
    errors::{PipelineError, PipelineResult},
    models::event::StorageEvent,
    pipeline::{
        consumer::{BatchRecord, CatalogBatchProcessor},
        parser::{ImportFileParser, ParseReport},
    },
    services::work_queue::SqliteWorkQueue,
};
use std::{slice, sync::Arc, time::Duration};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    task::{JoinHandle, JoinSet},
    time,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const TRIGGER_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct TriggerRunner {
    parser: Arc<ImportFileParser>,
    max_attempts: u32,
    retry_delay: Duration,
    invocation_timeout: Duration,
}

impl TriggerRunner {
    pub fn new(parser: Arc<ImportFileParser>, config: &PipelineConfig) -> Self {
        Self {
            parser,
            max_attempts: config.trigger_max_attempts,
            retry_delay: TRIGGER_RETRY_DELAY,
            invocation_timeout: config.invocation_timeout(),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_invocation_timeout(mut self, invocation_timeout: Duration) -> Self {
        self.invocation_timeout = invocation_timeout;
        self
    }

    /// Dispatch events until the channel closes or `shutdown` fires, then
    /// wait for in-flight invocations. Each event runs as its own task.
    pub async fn run(self, mut events: UnboundedReceiver<StorageEvent>, shutdown: CancellationToken) {
        let mut inflight = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
                event = events.recv() => match event {
                    Some(event) => {
                        let runner = self.clone();
                        inflight.spawn(async move { runner.deliver(event).await });
                    }
                    None => break,
                },
            }
        }
        while inflight.join_next().await.is_some() {}
        info!("trigger runner stopped");
    }

    /// Invoke the parser for one event, retrying the whole invocation on
    /// failure. Returns whether any attempt succeeded.
    pub async fn deliver(&self, event: StorageEvent) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.invoke(&event).await {
                Ok(report) => {
                    debug!("trigger for {}/{} done: {:?}", event.bucket, event.key, report);
                    return true;
                }
                Err(err) => {
                    warn!(
                        "parser invocation {}/{} for {}/{} failed: {}",
                        attempt, self.max_attempts, event.bucket, event.key, err
                    );
                    if attempt < self.max_attempts {
                        time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        error!(
            "giving up on {}/{} after {} attempts",
            event.bucket, event.key, self.max_attempts
        );
        false
    }

    async fn invoke(&self, event: &StorageEvent) -> PipelineResult<ParseReport> {
        time::timeout(self.invocation_timeout, self.parser.handle(slice::from_ref(event)))
            .await
            .map_err(|elapsed| PipelineError::infrastructure("parse invocation", elapsed))?
    }
}

pub struct QueuePoller {
    queue: SqliteWorkQueue,
    processor: Arc<CatalogBatchProcessor>,
    batch_size: usize,
    poll_interval: Duration,
    invocation_timeout: Duration,
}

impl QueuePoller {
    pub fn new(
        queue: SqliteWorkQueue,
        processor: Arc<CatalogBatchProcessor>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            queue,
            processor,
            batch_size: config.batch_size,
            poll_interval: config.poll_interval(),
            invocation_timeout: config.invocation_timeout(),
        }
    }

    pub fn with_invocation_timeout(mut self, invocation_timeout: Duration) -> Self {
        self.invocation_timeout = invocation_timeout;
        self
    }

    /// Poll until `shutdown` fires. Sleeps between polls when idle or failing.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            let idle = match self.poll_once().await {
                Ok(0) => true,
                Ok(_) => false,
                Err(err) => {
                    warn!("batch from {} left for redelivery: {}", self.queue.name(), err);
                    true
                }
            };
            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = time::sleep(self.poll_interval) => {}
                }
            }
        }
        info!("queue poller for {} stopped", self.queue.name());
    }

    /// Claim one batch and process it. Returns the number of messages acked;
    /// zero means the queue had nothing visible.
    pub async fn poll_once(&self) -> PipelineResult<usize> {
        let deliveries = self.queue.receive_batch(self.batch_size).await?;
        if deliveries.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = deliveries.iter().map(|d| d.id.clone()).collect();
        let records: Vec<BatchRecord> = deliveries.into_iter().map(BatchRecord::from).collect();

        time::timeout(self.invocation_timeout, self.processor.process_batch(&records))
            .await
            .map_err(|elapsed| PipelineError::infrastructure("batch invocation", elapsed))??;

        self.queue.ack(&ids).await?;
        Ok(ids.len())
    }
}

/// Wait for background workers to finish, logging any that panicked or
/// were aborted. Returns how many exited abnormally.
pub async fn join_workers(workers: Vec<(&'static str, JoinHandle<()>)>) -> usize {
    let mut abnormal = 0;
    for (name, handle) in workers {
        if let Err(err) = handle.await {
            error!("{} exited abnormally: {}", name, err);
            abnormal += 1;
        }
    }
    abnormal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        errors::PipelineResult,
        models::{
            catalog::{Product, Stock},
            event::OBJECT_CREATED_PUT,
        },
        services::{
            catalog_store::{CatalogStore, UuidGenerator},
            notifier::Notifier,
            storage_service::{ByteStream, ObjectStore},
            work_queue::WorkQueue,
        },
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{
        io,
        sync::atomic::{AtomicUsize, Ordering},
    };

    /// Fails the first `failures` gets, then serves a one-row CSV.
    struct FlakyStore {
        failures: usize,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn get_object(&self, _bucket: &str, _key: &str) -> PipelineResult<ByteStream> {
            use futures::StreamExt;
            let n = self.gets.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(PipelineError::infrastructure("get object", io::Error::other("throttled")));
            }
            let body = bytes::Bytes::from_static(b"title,description,price,count\nX,Y,10,2\n");
            Ok(futures::stream::iter(vec![Ok(body)]).boxed())
        }

        async fn copy_object(&self, _: &str, _: &str, _: &str) -> PipelineResult<()> {
            Ok(())
        }

        async fn delete_object(&self, _: &str, _: &str) -> PipelineResult<()> {
            Ok(())
        }
    }

    /// Opens objects that never produce a stream.
    #[derive(Default)]
    struct StalledStore {
        gets: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for StalledStore {
        async fn get_object(&self, _bucket: &str, _key: &str) -> PipelineResult<ByteStream> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            futures::future::pending().await
        }

        async fn copy_object(&self, _: &str, _: &str, _: &str) -> PipelineResult<()> {
            Ok(())
        }

        async fn delete_object(&self, _: &str, _: &str) -> PipelineResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingQueue(AtomicUsize);

    #[async_trait]
    impl WorkQueue for CountingQueue {
        async fn send(&self, _body: String) -> PipelineResult<String> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst).to_string())
        }
    }

    fn trigger(failures: usize, queue: Arc<CountingQueue>) -> (TriggerRunner, Arc<FlakyStore>) {
        let store = Arc::new(FlakyStore {
            failures,
            gets: AtomicUsize::new(0),
        });
        let config = PipelineConfig::default();
        let parser = Arc::new(ImportFileParser::new(store.clone(), queue, &config));
        let runner = TriggerRunner::new(parser, &config).with_retry_delay(Duration::ZERO);
        (runner, store)
    }

    fn upload_event() -> StorageEvent {
        StorageEvent::new(OBJECT_CREATED_PUT, "import-bucket", "uploaded/songs.csv")
    }

    #[tokio::test]
    async fn trigger_redelivers_failed_invocations() {
        let queue = Arc::new(CountingQueue::default());
        let (runner, store) = trigger(2, queue.clone());

        assert!(runner.deliver(upload_event()).await);
        assert_eq!(store.gets.load(Ordering::SeqCst), 3);
        assert_eq!(queue.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trigger_gives_up_after_max_attempts() {
        let queue = Arc::new(CountingQueue::default());
        let (runner, store) = trigger(10, queue.clone());

        assert!(!runner.deliver(upload_event()).await);
        assert_eq!(store.gets.load(Ordering::SeqCst), 3);
        assert_eq!(queue.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn trigger_counts_an_overrun_invocation_as_failed() {
        let store = Arc::new(StalledStore::default());
        let queue = Arc::new(CountingQueue::default());
        let config = PipelineConfig::default();
        let parser = Arc::new(ImportFileParser::new(store.clone(), queue.clone(), &config));
        let runner = TriggerRunner::new(parser, &config)
            .with_retry_delay(Duration::ZERO)
            .with_invocation_timeout(Duration::from_millis(20));

        assert!(!runner.deliver(upload_event()).await);
        assert_eq!(store.gets.load(Ordering::SeqCst), 3);
        assert_eq!(queue.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn trigger_run_stops_when_channel_closes() {
        let queue = Arc::new(CountingQueue::default());
        let (runner, _) = trigger(0, queue.clone());
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tx.send(upload_event()).unwrap();
        drop(tx);
        runner.run(rx, CancellationToken::new()).await;

        assert_eq!(queue.0.load(Ordering::SeqCst), 1);
    }

    struct FailingCatalog;

    #[async_trait]
    impl CatalogStore for FailingCatalog {
        async fn put_product(&self, _: &Product) -> PipelineResult<()> {
            Err(PipelineError::infrastructure("put product", io::Error::other("down")))
        }

        async fn put_stock(&self, _: &Stock) -> PipelineResult<()> {
            Ok(())
        }
    }

    struct SlowCatalog;

    #[async_trait]
    impl CatalogStore for SlowCatalog {
        async fn put_product(&self, _: &Product) -> PipelineResult<()> {
            time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        async fn put_stock(&self, _: &Stock) -> PipelineResult<()> {
            Ok(())
        }
    }

    struct NullNotifier;

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn publish(&self, _: &str, _: &str, _: &str) -> PipelineResult<String> {
            Ok("n".into())
        }
    }

    async fn poller(catalog: Arc<dyn CatalogStore>) -> (QueuePoller, SqliteWorkQueue) {
        let pool = Arc::new(db::memory_pool().await.unwrap());
        let queue = SqliteWorkQueue::new(pool, "catalog-items-queue", Duration::ZERO);
        let config = PipelineConfig::default();
        let processor = Arc::new(CatalogBatchProcessor::new(
            catalog,
            Arc::new(NullNotifier),
            Arc::new(UuidGenerator),
            &config,
        ));
        (QueuePoller::new(queue.clone(), processor, &config), queue)
    }

    fn body(title: &str) -> String {
        json!({"data": {"title": title, "description": "d", "price": "1", "count": "1"}}).to_string()
    }

    #[tokio::test]
    async fn poller_acks_successful_batches_of_at_most_five() {
        struct OkCatalog;

        #[async_trait]
        impl CatalogStore for OkCatalog {
            async fn put_product(&self, _: &Product) -> PipelineResult<()> {
                Ok(())
            }
            async fn put_stock(&self, _: &Stock) -> PipelineResult<()> {
                Ok(())
            }
        }

        let (poller, queue) = poller(Arc::new(OkCatalog)).await;
        for i in 0..7 {
            queue.send(body(&format!("t{}", i))).await.unwrap();
        }

        assert_eq!(poller.poll_once().await.unwrap(), 5);
        assert_eq!(poller.poll_once().await.unwrap(), 2);
        assert_eq!(poller.poll_once().await.unwrap(), 0);
        assert_eq!(queue.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn poller_leaves_failed_batches_for_redelivery() {
        let (poller, queue) = poller(Arc::new(FailingCatalog)).await;
        queue.send(body("a")).await.unwrap();

        assert!(poller.poll_once().await.is_err());
        assert_eq!(queue.depth().await.unwrap(), 1);

        let redelivered = queue.receive_batch(5).await.unwrap();
        assert_eq!(redelivered[0].receive_count, 2);
    }

    #[tokio::test]
    async fn poller_leaves_overrun_batches_unacknowledged() {
        let (poller, queue) = poller(Arc::new(SlowCatalog)).await;
        let poller = poller.with_invocation_timeout(Duration::from_millis(20));
        queue.send(body("a")).await.unwrap();

        let err = poller.poll_once().await.unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Infrastructure);
        assert_eq!(queue.depth().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn join_workers_reports_panicked_workers() {
        let clean = tokio::spawn(async {});
        let crashed = tokio::spawn(async { panic!("worker crashed") });

        let abnormal = join_workers(vec![("clean", clean), ("crashed", crashed)]).await;
        assert_eq!(abnormal, 1);
    }
}
