//! src/services/storage_service.rs
//!
//! StorageService: S3-like object operations backed by SQLite for metadata
//! and local disk for object payloads, sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{key}`. Every write or delete is
//! announced as a storage-change event when an event channel is attached.

use crate::{
    errors::{PipelineError, PipelineResult},
    models::{
        bucket::Bucket,
        event::{OBJECT_CREATED_COPY, OBJECT_CREATED_PUT, OBJECT_REMOVED_DELETE, StorageEvent},
        object::Object,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut, stream::BoxStream};
use md5::Context;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
    sync::mpsc::UnboundedSender,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

/// Streamed object payload.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Object operations the CSV parser depends on.
///
/// Implemented by `StorageService`; tests substitute in-memory fakes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open an object for streaming. A missing object is an error.
    async fn get_object(&self, bucket: &str, key: &str) -> PipelineResult<ByteStream>;

    /// Copy `source_key` to `destination_key`, overwriting the destination.
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> PipelineResult<()>;

    async fn delete_object(&self, bucket: &str, key: &str) -> PipelineResult<()>;
}

/// StorageService provides basic S3-like operations:
/// - Upload an object (writes bytes to disk and upserts metadata into SQLite)
/// - Get object (reads metadata from SQLite and payload from disk)
/// - Copy object (duplicates payload and metadata under a new key)
/// - Delete object (removes metadata and payload)
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    events: Option<UnboundedSender<StorageEvent>>,
}

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

impl StorageService {
    /// Create a new StorageService backed by the provided SQLite pool and
    /// using `base_path` as the root directory for object payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            events: None,
        }
    }

    /// Announce create/copy/delete operations on `events`.
    pub fn with_events(mut self, events: UnboundedSender<StorageEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event_name: &str, bucket: &str, key: &str) {
        if let Some(tx) = &self.events {
            if tx.send(StorageEvent::new(event_name, bucket, key)).is_err() {
                debug!("storage event receiver dropped; {} {}/{} not announced", event_name, bucket, key);
            }
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects empty or oversized keys, empty, `.` or `..` path segments
    /// (which covers a leading `/`), backslashes and control characters.
    /// Dots inside a segment, as in `vinyls..2024.csv`, are fine.
    pub fn ensure_key_safe(key: &str) -> StorageResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StorageError::InvalidObjectKey);
        }
        if key
            .split('/')
            .any(|segment| matches!(segment, "" | "." | ".."))
        {
            return Err(StorageError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidObjectKey);
        }
        Ok(())
    }

    /// Validate bucket name format.
    ///
    /// Enforces S3-like naming rules:
    /// - 3–63 characters
    /// - lowercase letters, digits, dots, hyphens only
    /// - cannot start/end with dot or hyphen
    /// - cannot contain consecutive dots or dot-hyphen patterns
    pub fn ensure_bucket_name_safe(name: &str) -> StorageResult<()> {
        let invalid = |reason: &str| StorageError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let len = name.len();
        if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
            return Err(invalid("must be between 3 and 63 characters"));
        }
        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
        {
            return Err(invalid(
                "allowed characters are lowercase letters, digits, dots, and hyphens",
            ));
        }
        if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
            return Err(invalid("must start and end with a lowercase letter or digit"));
        }
        if name.contains("..") || name.contains("-.") || name.contains(".-") {
            return Err(invalid(
                "cannot contain consecutive dots or dot-hyphen combinations",
            ));
        }
        Ok(())
    }

    /// Compute the physical base folder path for a bucket.
    fn bucket_root(&self, bucket_name: &str) -> PathBuf {
        self.base_path.join(bucket_name)
    }

    /// Generate two-level shard identifiers for an object key.
    ///
    /// Uses MD5(bucket/key) and returns the first two bytes as lowercase
    /// hexadecimal strings (00–ff).
    fn object_shards(bucket_name: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket_name, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct a fully-qualified object payload path.
    fn object_path(&self, bucket_name: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket_name, key);
        let mut path = self.bucket_root(bucket_name);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Fetch bucket metadata from SQLite.
    async fn fetch_bucket(&self, bucket: &str) -> StorageResult<Bucket> {
        Self::ensure_bucket_name_safe(bucket)?;
        sqlx::query_as::<_, Bucket>("SELECT id, name, created_at FROM buckets WHERE name = ?")
            .bind(bucket)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StorageError::BucketNotFound(bucket.to_string()),
                other => StorageError::Sqlx(other),
            })
    }

    async fn fetch_object(&self, bucket: &Bucket, key: &str) -> StorageResult<Object> {
        sqlx::query_as::<_, Object>(
            "SELECT id, bucket_id, key, filename, content_type, size_bytes, etag, last_modified
             FROM objects
             WHERE key = ? AND bucket_id = ?",
        )
        .bind(key)
        .bind(bucket.id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::ObjectNotFound {
                bucket: bucket.name.clone(),
                key: key.to_string(),
            },
            other => StorageError::Sqlx(other),
        })
    }

    /// Create a bucket and initialize its directory.
    ///
    /// Returns BucketAlreadyExists if name conflict occurs.
    pub async fn create_bucket(&self, name: &str) -> StorageResult<Bucket> {
        Self::ensure_bucket_name_safe(name)?;
        fs::create_dir_all(self.bucket_root(name)).await?;

        let bucket = Bucket {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        match sqlx::query("INSERT INTO buckets (id, name, created_at) VALUES (?, ?, ?)")
            .bind(bucket.id)
            .bind(&bucket.name)
            .bind(bucket.created_at)
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(bucket),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::BucketAlreadyExists(name.to_string()))
            }
            Err(err) => Err(StorageError::Sqlx(err)),
        }
    }

    pub async fn bucket_exists(&self, name: &str) -> StorageResult<bool> {
        match self.fetch_bucket(name).await {
            Ok(_) => Ok(true),
            Err(StorageError::BucketNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Return the named bucket, creating it when missing.
    pub async fn ensure_bucket(&self, name: &str) -> StorageResult<Bucket> {
        match self.fetch_bucket(name).await {
            Ok(bucket) => Ok(bucket),
            Err(StorageError::BucketNotFound(_)) => match self.create_bucket(name).await {
                Err(StorageError::BucketAlreadyExists(_)) => self.fetch_bucket(name).await,
                other => other,
            },
            Err(err) => Err(err),
        }
    }

    /// Stream-upload an object to disk and update metadata.
    ///
    /// - Writes bytes incrementally to a temporary file.
    /// - Computes MD5/etag and size while streaming.
    /// - Atomically renames into final location.
    /// - Upserts metadata row (S3-like overwrite semantics).
    ///
    /// Announces `ObjectCreated:Put` once the metadata row is committed.
    pub async fn upload_object_stream<S>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        stream: S,
    ) -> StorageResult<Object>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self
            .store_payload(&bucket_rec, key, content_type, stream)
            .await?;
        self.emit(OBJECT_CREATED_PUT, &bucket_rec.name, key);
        Ok(object)
    }

    /// Fetch an object for reading.
    ///
    /// Returns metadata and an opened File handle ready for streaming out.
    /// Returns ObjectNotFound if metadata exists but physical file is missing.
    pub async fn get_object_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(Object, File)> {
        Self::ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self.fetch_object(&bucket_rec, key).await?;

        let file_path = self.object_path(&bucket_rec.name, key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::Io(err)
            }
        })?;

        Ok((object, file))
    }

    /// Fetch only object metadata.
    pub async fn get_object_metadata(&self, bucket: &str, key: &str) -> StorageResult<Object> {
        Self::ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        self.fetch_object(&bucket_rec, key).await
    }

    /// Copy an object within a bucket, overwriting any existing destination.
    ///
    /// Repeating the same copy rewrites identical bytes and metadata, so a
    /// retried move converges on the same destination state.
    pub async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> StorageResult<Object> {
        Self::ensure_key_safe(destination_key)?;
        let (source, file) = self.get_object_reader(bucket, source_key).await?;
        let bucket_rec = self.fetch_bucket(bucket).await?;

        let object = self
            .store_payload(
                &bucket_rec,
                destination_key,
                source.content_type.clone(),
                ReaderStream::new(file),
            )
            .await?;
        debug!("copied {}/{} to {}", bucket, source_key, destination_key);
        self.emit(OBJECT_CREATED_COPY, &bucket_rec.name, destination_key);
        Ok(object)
    }

    /// Delete an object's metadata and payload.
    ///
    /// Deleting a key that does not exist succeeds without effect, as in S3.
    /// Returns whether an object was actually removed.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Self::ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;

        let result = sqlx::query("DELETE FROM objects WHERE key = ? AND bucket_id = ?")
            .bind(key)
            .bind(bucket_rec.id)
            .execute(&*self.db)
            .await?;

        let file_path = self.object_path(&bucket_rec.name, key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            let bucket_root = self.bucket_root(&bucket_rec.name);
            self.prune_empty_dirs(parent, &bucket_root).await;
        }

        let removed = result.rows_affected() > 0;
        if removed {
            self.emit(OBJECT_REMOVED_DELETE, &bucket_rec.name, key);
        }
        Ok(removed)
    }

    /// Write `stream` to the payload path for `key` and upsert its metadata.
    ///
    /// Ensures durable writes (fsync) and cleans up temp files on errors.
    async fn store_payload<S>(
        &self,
        bucket_rec: &Bucket,
        key: &str,
        content_type: Option<String>,
        stream: S,
    ) -> StorageResult<Object>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let file_path = self.object_path(&bucket_rec.name, key);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| StorageError::Io(io::Error::other("object path missing parent directory")))?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let (size_bytes, etag) = match write_temp_file(&tmp_path, stream).await {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        };

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }

        let filename = key.rsplit('/').next().unwrap_or(key).to_string();

        let insert_result = sqlx::query_as::<_, Object>(
            r#"
            INSERT INTO objects (
                id, bucket_id, key, filename, content_type, size_bytes, etag, last_modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(bucket_id, key) DO UPDATE SET
                filename = excluded.filename,
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified
            RETURNING id, bucket_id, key, filename, content_type, size_bytes, etag, last_modified
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bucket_rec.id)
        .bind(key)
        .bind(&filename)
        .bind(content_type)
        .bind(size_bytes)
        .bind(&etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(obj) => Ok(obj),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StorageError::Sqlx(err))
            }
        }
    }

    /// Recursively remove empty directories up to bucket root.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn get_object(&self, bucket: &str, key: &str) -> PipelineResult<ByteStream> {
        let (_, file) = self
            .get_object_reader(bucket, key)
            .await
            .map_err(|err| PipelineError::infrastructure("get object", err))?;
        Ok(ReaderStream::new(file).boxed())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> PipelineResult<()> {
        StorageService::copy_object(self, bucket, source_key, destination_key)
            .await
            .map(|_| ())
            .map_err(|err| PipelineError::infrastructure("copy object", err))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> PipelineResult<()> {
        StorageService::delete_object(self, bucket, key)
            .await
            .map(|_| ())
            .map_err(|err| PipelineError::infrastructure("delete object", err))
    }
}

/// Stream chunks into a fresh file at `path`, returning size and MD5 hex.
async fn write_temp_file<S>(path: &Path, stream: S) -> io::Result<(i64, String)>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut file = File::create(path).await?;
    let mut size_bytes: i64 = 0;
    let mut digest = Context::new();
    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        size_bytes += chunk.len() as i64;
        digest.consume(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok((size_bytes, format!("{:x}", digest.compute())))
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use futures::{TryStreamExt, stream};
    use tokio::sync::mpsc;

    async fn service() -> (StorageService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::memory_pool().await.unwrap();
        let service = StorageService::new(Arc::new(pool), dir.path());
        service.create_bucket("import-bucket").await.unwrap();
        (service, dir)
    }

    fn body(text: &'static str) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::iter(vec![Ok(Bytes::from_static(text.as_bytes()))])
    }

    async fn read_all(service: &StorageService, key: &str) -> String {
        let stream = ObjectStore::get_object(service, "import-bucket", key)
            .await
            .unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        String::from_utf8(chunks.concat()).unwrap()
    }

    #[test]
    fn rejects_unsafe_keys() {
        assert!(StorageService::ensure_key_safe("uploaded/songs.csv").is_ok());
        assert!(StorageService::ensure_key_safe("").is_err());
        assert!(StorageService::ensure_key_safe("/etc/passwd").is_err());
        assert!(StorageService::ensure_key_safe("uploaded/../secret").is_err());
        assert!(StorageService::ensure_key_safe("uploaded\\a.csv").is_err());
        assert!(StorageService::ensure_key_safe("uploaded/./a.csv").is_err());
        assert!(StorageService::ensure_key_safe("uploaded//a.csv").is_err());
        assert!(StorageService::ensure_key_safe("uploaded/").is_err());
        assert!(StorageService::ensure_key_safe("uploaded/vinyls..2024.csv").is_ok());
    }

    #[test]
    fn rejects_invalid_bucket_names() {
        assert!(StorageService::ensure_bucket_name_safe("import-bucket").is_ok());
        assert!(StorageService::ensure_bucket_name_safe("ab").is_err());
        assert!(StorageService::ensure_bucket_name_safe("Import").is_err());
        assert!(StorageService::ensure_bucket_name_safe("-bucket").is_err());
        assert!(StorageService::ensure_bucket_name_safe("a..b").is_err());
    }

    #[tokio::test]
    async fn upload_then_read_back() {
        let (service, _dir) = service().await;
        let object = service
            .upload_object_stream("import-bucket", "uploaded/songs.csv", None, body("a,b\n1,2\n"))
            .await
            .unwrap();

        assert_eq!(object.filename, "songs.csv");
        assert_eq!(object.size_bytes, 8);
        assert_eq!(object.etag.as_deref(), Some(format!("{:x}", md5::compute("a,b\n1,2\n")).as_str()));
        assert_eq!(read_all(&service, "uploaded/songs.csv").await, "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn ensure_bucket_is_idempotent() {
        let (service, _dir) = service().await;
        let first = service.ensure_bucket("import-bucket").await.unwrap();
        let second = service.ensure_bucket("import-bucket").await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(matches!(
            service.create_bucket("import-bucket").await,
            Err(StorageError::BucketAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn copy_is_repeatable_and_delete_tolerates_missing() {
        let (service, _dir) = service().await;
        service
            .upload_object_stream("import-bucket", "uploaded/songs.csv", None, body("x\n"))
            .await
            .unwrap();

        service
            .copy_object("import-bucket", "uploaded/songs.csv", "parsed/songs.csv")
            .await
            .unwrap();
        service
            .copy_object("import-bucket", "uploaded/songs.csv", "parsed/songs.csv")
            .await
            .unwrap();
        assert_eq!(read_all(&service, "parsed/songs.csv").await, "x\n");

        assert!(service.delete_object("import-bucket", "uploaded/songs.csv").await.unwrap());
        assert!(!service.delete_object("import-bucket", "uploaded/songs.csv").await.unwrap());
        assert!(matches!(
            service.get_object_metadata("import-bucket", "uploaded/songs.csv").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn missing_object_is_an_infrastructure_error() {
        let (service, _dir) = service().await;
        let err = ObjectStore::get_object(&service, "import-bucket", "uploaded/none.csv")
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Infrastructure);
    }

    #[tokio::test]
    async fn announces_storage_events() {
        let (service, _dir) = service().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = service.with_events(tx);

        service
            .upload_object_stream("import-bucket", "uploaded/songs.csv", None, body("x\n"))
            .await
            .unwrap();
        service
            .copy_object("import-bucket", "uploaded/songs.csv", "parsed/songs.csv")
            .await
            .unwrap();
        service
            .delete_object("import-bucket", "uploaded/songs.csv")
            .await
            .unwrap();

        let names: Vec<(String, String)> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.event_name, e.key))
            .collect();
        assert_eq!(
            names,
            vec![
                (OBJECT_CREATED_PUT.to_string(), "uploaded/songs.csv".to_string()),
                (OBJECT_CREATED_COPY.to_string(), "parsed/songs.csv".to_string()),
                (OBJECT_REMOVED_DELETE.to_string(), "uploaded/songs.csv".to_string()),
            ]
        );
    }
}
