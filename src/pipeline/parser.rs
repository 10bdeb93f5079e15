//! CSV ingestion parser.
//!
//! Triggered by storage-change events. For each created `.csv` object under
//! the intake folder: stream it into rows, enqueue one message per row, then
//! move the object to the parsed folder. The move only happens after every
//! send is acknowledged, so a failed invocation leaves the object in intake
//! and a retry starts over (possibly re-sending rows already queued).

use crate::{
    config::PipelineConfig,
    errors::{PipelineError, PipelineResult},
    models::{
        event::StorageEvent,
        message::{CsvRow, QueuedProductMessage},
        object::parsed_key,
    },
    pipeline::filter::skip_reason,
    services::{storage_service::ObjectStore, work_queue::WorkQueue},
};
use chrono::{SecondsFormat, Utc};
use futures::{StreamExt, TryStreamExt, future, stream::Peekable};
use std::{collections::BTreeSet, pin::Pin, sync::Arc};
use tracing::{debug, error, info, warn};

/// Outcome of one parser invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub files_processed: usize,
    pub rows_enqueued: usize,
    pub events_skipped: usize,
}

pub struct ImportFileParser {
    store: Arc<dyn ObjectStore>,
    queue: Arc<dyn WorkQueue>,
    intake_prefix: String,
    parsed_prefix: String,
}

impl ImportFileParser {
    pub fn new(store: Arc<dyn ObjectStore>, queue: Arc<dyn WorkQueue>, config: &PipelineConfig) -> Self {
        Self {
            store,
            queue,
            intake_prefix: config.intake_prefix(),
            parsed_prefix: config.parsed_prefix(),
        }
    }

    /// Process a trigger payload in order. The first failing record fails
    /// the whole invocation; records after it are not looked at.
    pub async fn handle(&self, events: &[StorageEvent]) -> PipelineResult<ParseReport> {
        let mut report = ParseReport::default();

        for event in events {
            if let Some(reason) = skip_reason(event, &self.intake_prefix, &self.parsed_prefix) {
                debug!(
                    "Skipping {} event for {}/{}: {:?}",
                    event.event_name, event.bucket, event.key, reason
                );
                report.events_skipped += 1;
                continue;
            }

            let rows = self
                .process_object(&event.bucket, &event.key)
                .await
                .inspect_err(|err| {
                    error!("Error processing {}/{}: {}", event.bucket, event.key, err)
                })?;
            report.files_processed += 1;
            report.rows_enqueued += rows;
        }

        Ok(report)
    }

    /// Fetch, parse, enqueue and move a single object. Returns the row count.
    pub async fn process_object(&self, bucket: &str, key: &str) -> PipelineResult<usize> {
        info!("Getting file content for {}/{}", bucket, key);
        let rows = self.read_rows(bucket, key).await?;
        info!("Parsed {} rows from {}/{}", rows.len(), bucket, key);

        let processed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let messages = project_rows(rows, &processed_at);
        self.enqueue_all(bucket, key, &messages).await?;

        self.move_to_parsed(bucket, key).await?;
        Ok(messages.len())
    }

    /// Stream the object through a strict CSV reader.
    ///
    /// Any malformed row fails the whole file; nothing is returned partially.
    /// Rows are keyed by header name, so when a header repeats only the
    /// value of its last column survives.
    async fn read_rows(&self, bucket: &str, key: &str) -> PipelineResult<Vec<CsvRow>> {
        let body = self.store.get_object(bucket, key).await?;

        let mut body: Peekable<_> = body
            .try_filter(|chunk| future::ready(!chunk.is_empty()))
            .peekable();
        if Pin::new(&mut body).peek().await.is_none() {
            return Err(PipelineError::EmptyObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        let mut reader = csv_async::AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .create_reader(body.into_async_read());

        let headers: Vec<String> = reader
            .headers()
            .await
            .map_err(|err| csv_error(key, err))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let distinct: BTreeSet<&str> = headers.iter().map(String::as_str).collect();
        if distinct.len() != headers.len() {
            warn!(
                "{}/{} has repeated column headers {:?}; later columns win",
                bucket, key, headers
            );
        }

        let mut rows = Vec::new();
        let mut record = csv_async::StringRecord::new();
        while reader
            .read_record(&mut record)
            .await
            .map_err(|err| csv_error(key, err))?
        {
            let row: CsvRow = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            debug!("PRODUCT: {:?}", row);
            rows.push(row);
        }

        Ok(rows)
    }

    /// Send every message concurrently and wait for all of them to settle.
    async fn enqueue_all(
        &self,
        bucket: &str,
        key: &str,
        messages: &[QueuedProductMessage],
    ) -> PipelineResult<()> {
        let sends = messages.iter().map(|message| async move {
            let body = serde_json::to_string(message)
                .map_err(|err| PipelineError::infrastructure("encode queue message", err))?;
            self.queue.send(body).await
        });
        let results = future::join_all(sends).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if let Some(err) = results.into_iter().find_map(Result::err) {
            warn!(
                "{} of {} sends failed for {}/{}; object stays in intake",
                failed,
                messages.len(),
                bucket,
                key
            );
            return Err(err);
        }

        info!("Enqueued {} messages for {}/{}", messages.len(), bucket, key);
        Ok(())
    }

    /// Copy to the parsed folder, then delete the original.
    ///
    /// A failed delete still fails the invocation; the repeated copy on retry
    /// overwrites the destination with the same bytes.
    async fn move_to_parsed(&self, bucket: &str, key: &str) -> PipelineResult<()> {
        let destination = parsed_key(key, &self.intake_prefix, &self.parsed_prefix)
            .ok_or_else(|| PipelineError::Validation(format!("`{}` is not under intake", key)))?;

        info!("Copying {} to {}", key, destination);
        self.store.copy_object(bucket, key, &destination).await?;
        self.store.delete_object(bucket, key).await?;
        info!("Moved {}/{} to {}", bucket, key, destination);
        Ok(())
    }
}

/// Wrap each row with its 0-based position and a shared timestamp.
pub fn project_rows(rows: Vec<CsvRow>, processed_at: &str) -> Vec<QueuedProductMessage> {
    rows.into_iter()
        .enumerate()
        .map(|(product_index, data)| QueuedProductMessage {
            data,
            processed_at: processed_at.to_string(),
            product_index,
        })
        .collect()
}

// I/O failures while streaming are storage trouble, not bad CSV.
fn csv_error(key: &str, err: csv_async::Error) -> PipelineError {
    if matches!(err.kind(), csv_async::ErrorKind::Io(_)) {
        PipelineError::infrastructure("read object", err)
    } else {
        PipelineError::Parse {
            key: key.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::ErrorKind,
        models::event::{OBJECT_CREATED_COPY, OBJECT_CREATED_PUT, OBJECT_REMOVED_DELETE},
        services::storage_service::ByteStream,
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use std::{
        collections::HashMap,
        io,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        fail_delete: bool,
        ops: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn with(key: &str, body: &str) -> Self {
            let store = Self::default();
            store.put(key, body);
            store
        }

        fn put(&self, key: &str, body: &str) {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), body.as_bytes().to_vec());
        }

        fn has(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains_key(key)
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn get_object(&self, _bucket: &str, key: &str) -> PipelineResult<ByteStream> {
            self.ops.lock().unwrap().push(format!("get {}", key));
            let body = self.objects.lock().unwrap().get(key).cloned().ok_or_else(|| {
                PipelineError::infrastructure("get object", io::Error::other("NoSuchKey"))
            })?;
            // Split into small chunks so rows straddle chunk boundaries.
            let chunks: Vec<io::Result<Bytes>> = body
                .chunks(3)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            Ok(stream::iter(chunks).boxed())
        }

        async fn copy_object(&self, _bucket: &str, source: &str, destination: &str) -> PipelineResult<()> {
            self.ops
                .lock()
                .unwrap()
                .push(format!("copy {} {}", source, destination));
            let mut objects = self.objects.lock().unwrap();
            let body = objects.get(source).cloned().ok_or_else(|| {
                PipelineError::infrastructure("copy object", io::Error::other("NoSuchKey"))
            })?;
            objects.insert(destination.to_string(), body);
            Ok(())
        }

        async fn delete_object(&self, _bucket: &str, key: &str) -> PipelineResult<()> {
            self.ops.lock().unwrap().push(format!("delete {}", key));
            if self.fail_delete {
                return Err(PipelineError::infrastructure(
                    "delete object",
                    io::Error::other("AccessDenied"),
                ));
            }
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// Records sent bodies; fails the send whose 0-based call number is `fail_on`.
    #[derive(Default)]
    struct RecordingQueue {
        sent: Mutex<Vec<String>>,
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl RecordingQueue {
        fn messages(&self) -> Vec<QueuedProductMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|b| serde_json::from_str(b).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl WorkQueue for RecordingQueue {
        async fn send(&self, body: String) -> PipelineResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on {
                return Err(PipelineError::infrastructure(
                    "send to queue",
                    io::Error::other("queue unavailable"),
                ));
            }
            self.sent.lock().unwrap().push(body);
            Ok(format!("msg-{}", call))
        }
    }

    fn parser(store: Arc<MemoryStore>, queue: Arc<RecordingQueue>) -> ImportFileParser {
        ImportFileParser::new(store, queue, &PipelineConfig::default())
    }

    fn created(key: &str) -> StorageEvent {
        StorageEvent::new(OBJECT_CREATED_PUT, "import-bucket", key)
    }

    const THREE_ROWS: &str = "title,description,price,count\n\
        The Dark Side Of the Moon,50th Anniversary Edition,89.99,4\n\
        Abbey Road,Edition Deluxe - 2LPs,49.84,2\n\
        In Rainbows,LP Color Edition,39.99,7\n";

    #[tokio::test]
    async fn enqueues_one_message_per_row_in_file_order() {
        let store = Arc::new(MemoryStore::with("uploaded/songs.csv", THREE_ROWS));
        let queue = Arc::new(RecordingQueue::default());

        let report = parser(store.clone(), queue.clone())
            .handle(&[created("uploaded/songs.csv")])
            .await
            .unwrap();

        assert_eq!(
            report,
            ParseReport {
                files_processed: 1,
                rows_enqueued: 3,
                events_skipped: 0
            }
        );

        let mut messages = queue.messages();
        messages.sort_by_key(|m| m.product_index);
        let indexed: Vec<(usize, &str)> = messages
            .iter()
            .map(|m| (m.product_index, m.data["title"].as_str()))
            .collect();
        assert_eq!(
            indexed,
            vec![
                (0, "The Dark Side Of the Moon"),
                (1, "Abbey Road"),
                (2, "In Rainbows")
            ]
        );
        assert_eq!(messages[1].data["price"], "49.84");
        assert_eq!(messages[1].data["count"], "2");
        assert!(chrono::DateTime::parse_from_rfc3339(&messages[0].processed_at).is_ok());
    }

    #[tokio::test]
    async fn moves_object_after_all_sends_succeed() {
        let store = Arc::new(MemoryStore::with("uploaded/songs.csv", THREE_ROWS));
        let queue = Arc::new(RecordingQueue::default());

        parser(store.clone(), queue)
            .handle(&[created("uploaded/songs.csv")])
            .await
            .unwrap();

        assert!(!store.has("uploaded/songs.csv"));
        assert!(store.has("parsed/songs.csv"));
        assert_eq!(
            store.ops(),
            vec![
                "get uploaded/songs.csv",
                "copy uploaded/songs.csv parsed/songs.csv",
                "delete uploaded/songs.csv",
            ]
        );
    }

    #[tokio::test]
    async fn failed_send_leaves_object_in_intake() {
        let store = Arc::new(MemoryStore::with("uploaded/songs.csv", THREE_ROWS));
        let queue = Arc::new(RecordingQueue {
            fail_on: Some(1),
            ..RecordingQueue::default()
        });

        let err = parser(store.clone(), queue.clone())
            .handle(&[created("uploaded/songs.csv")])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert!(err.to_string().contains("queue unavailable"));
        // Every send was attempted; the others were acknowledged.
        assert_eq!(queue.calls.load(Ordering::SeqCst), 3);
        assert_eq!(queue.messages().len(), 2);
        assert!(store.has("uploaded/songs.csv"));
        assert!(!store.has("parsed/songs.csv"));
    }

    #[tokio::test]
    async fn retry_after_partial_send_duplicates_rows() {
        let store = Arc::new(MemoryStore::with("uploaded/songs.csv", THREE_ROWS));
        let queue = Arc::new(RecordingQueue {
            fail_on: Some(2),
            ..RecordingQueue::default()
        });
        let parser = parser(store.clone(), queue.clone());

        assert!(parser.handle(&[created("uploaded/songs.csv")]).await.is_err());
        parser.handle(&[created("uploaded/songs.csv")]).await.unwrap();

        // Two rows from the failed attempt plus three from the retry.
        assert_eq!(queue.messages().len(), 5);
        assert!(store.has("parsed/songs.csv"));
    }

    #[tokio::test]
    async fn malformed_csv_enqueues_nothing() {
        let body = "title,description,price,count\nA,B,1,2\nC,D,3\nE,F,5,6\n";
        let store = Arc::new(MemoryStore::with("uploaded/bad.csv", body));
        let queue = Arc::new(RecordingQueue::default());

        let err = parser(store.clone(), queue.clone())
            .handle(&[created("uploaded/bad.csv")])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(queue.calls.load(Ordering::SeqCst), 0);
        assert!(store.has("uploaded/bad.csv"));
    }

    #[tokio::test]
    async fn empty_object_is_fatal() {
        let store = Arc::new(MemoryStore::with("uploaded/empty.csv", ""));
        let queue = Arc::new(RecordingQueue::default());

        let err = parser(store.clone(), queue)
            .handle(&[created("uploaded/empty.csv")])
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyObject { .. }));
        assert!(store.has("uploaded/empty.csv"));
    }

    #[tokio::test]
    async fn missing_object_is_fatal() {
        let store = Arc::new(MemoryStore::default());
        let queue = Arc::new(RecordingQueue::default());

        let err = parser(store, queue)
            .handle(&[created("uploaded/gone.csv")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }

    #[tokio::test]
    async fn header_only_file_is_moved_without_messages() {
        let store = Arc::new(MemoryStore::with("uploaded/none.csv", "title,description,price,count\n"));
        let queue = Arc::new(RecordingQueue::default());

        let report = parser(store.clone(), queue.clone())
            .handle(&[created("uploaded/none.csv")])
            .await
            .unwrap();

        assert_eq!(report.rows_enqueued, 0);
        assert!(store.has("parsed/none.csv"));
    }

    #[tokio::test]
    async fn delete_failure_fails_invocation_but_copy_is_repeatable() {
        let store = Arc::new(MemoryStore {
            fail_delete: true,
            ..MemoryStore::default()
        });
        store.put("uploaded/songs.csv", THREE_ROWS);
        let queue = Arc::new(RecordingQueue::default());
        let parser = parser(store.clone(), queue);

        for _ in 0..2 {
            let err = parser
                .handle(&[created("uploaded/songs.csv")])
                .await
                .unwrap_err();
            assert!(err.to_string().contains("AccessDenied"));
        }

        assert!(store.has("uploaded/songs.csv"));
        let parsed = store.objects.lock().unwrap()["parsed/songs.csv"].clone();
        assert_eq!(parsed, THREE_ROWS.as_bytes());
    }

    #[tokio::test]
    async fn skips_irrelevant_events_silently() {
        let store = Arc::new(MemoryStore::default());
        store.put("parsed/songs.csv", THREE_ROWS);
        store.put("uploaded/readme.txt", "hello");
        let queue = Arc::new(RecordingQueue::default());

        let report = parser(store.clone(), queue.clone())
            .handle(&[
                created("parsed/songs.csv"),
                created("uploaded/readme.txt"),
                StorageEvent::new(OBJECT_REMOVED_DELETE, "import-bucket", "uploaded/songs.csv"),
            ])
            .await
            .unwrap();

        assert_eq!(report.events_skipped, 3);
        assert_eq!(report.files_processed, 0);
        assert!(store.ops().is_empty());
        assert_eq!(queue.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn keeps_extra_columns_and_quoted_fields() {
        let body = "title,description,price,count,label\n\"Glow On\",\"Color Edition, 2LP\",19.32,5,Roadrunner\n";
        let store = Arc::new(MemoryStore::with("uploaded/extra.CSV", body));
        let queue = Arc::new(RecordingQueue::default());

        parser(store, queue.clone())
            .handle(&[created("uploaded/extra.CSV")])
            .await
            .unwrap();

        let messages = queue.messages();
        assert_eq!(messages[0].data["description"], "Color Edition, 2LP");
        assert_eq!(messages[0].data["label"], "Roadrunner");
    }

    #[test]
    fn projection_numbers_rows_from_zero() {
        let rows = vec![CsvRow::new(), CsvRow::new()];
        let messages = project_rows(rows, "2024-05-01T10:00:00.000Z");
        assert_eq!(messages[0].product_index, 0);
        assert_eq!(messages[1].product_index, 1);
        assert!(messages.iter().all(|m| m.processed_at == "2024-05-01T10:00:00.000Z"));
    }

    #[tokio::test]
    async fn repeated_header_keeps_the_last_column() {
        let store = Arc::new(MemoryStore::with(
            "uploaded/dupes.csv",
            "title,price,price,count\nAnimals,10,12,1\n",
        ));
        let queue = Arc::new(RecordingQueue::default());

        parser(store, queue.clone())
            .handle(&[created("uploaded/dupes.csv")])
            .await
            .unwrap();

        let messages = queue.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data.len(), 3);
        assert_eq!(messages[0].data["price"], "12");
    }

    #[tokio::test]
    async fn nested_parsed_folder_is_moved_once() {
        let config = PipelineConfig {
            parsed_folder: "uploaded/parsed".into(),
            ..PipelineConfig::default()
        };
        let store = Arc::new(MemoryStore::with("uploaded/songs.csv", THREE_ROWS));
        let queue = Arc::new(RecordingQueue::default());
        let parser = ImportFileParser::new(store.clone(), queue.clone(), &config);

        parser.handle(&[created("uploaded/songs.csv")]).await.unwrap();
        assert!(store.has("uploaded/parsed/songs.csv"));

        let copied = StorageEvent::new(OBJECT_CREATED_COPY, "import-bucket", "uploaded/parsed/songs.csv");
        let report = parser.handle(&[copied]).await.unwrap();
        assert_eq!(report.files_processed, 0);
        assert_eq!(report.events_skipped, 1);
        assert_eq!(queue.messages().len(), 3);
        assert!(!store.has("uploaded/parsed/parsed/songs.csv"));
    }
}
