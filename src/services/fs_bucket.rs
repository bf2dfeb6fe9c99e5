//! Filesystem-backed bucket: SQLite for metadata, local disk for payloads.
//!
//! Payloads live beneath `base_path/{shard}/{shard}/{digest}` where the shard
//! prefix and the physical filename are both derived from MD5 of the object
//! key. Keys are therefore opaque strings as far as the filesystem is
//! concerned; they never become path components.

use crate::{
    models::object::ObjectRecord,
    services::bucket::{
        Bucket, BucketError, BucketResult, ByteStream, ListedObject, PutOptions, StoredObject,
    },
};
use async_trait::async_trait;
use futures::StreamExt;
use md5::Context;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Production [`Bucket`] implementation.
///
/// One logical bucket; object overwrite is an upsert on the metadata row plus
/// an atomic rename over the payload file, so readers never observe a
/// half-written object.
#[derive(Clone)]
pub struct FsBucket {
    /// Shared SQLite connection pool used for metadata operations.
    db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    base_path: PathBuf,
}

impl FsBucket {
    /// Create a new FsBucket backed by the provided SQLite pool and using
    /// `base_path` as the root directory for object payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Minimal key validation.
    ///
    /// Keys never touch the filesystem namespace (paths are hash-derived), so
    /// this only rejects degenerate input: empty, oversized, or containing
    /// control bytes.
    fn ensure_key_safe(&self, key: &str) -> BucketResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(BucketError::InvalidKey);
        }
        if key.bytes().any(|b| b.is_ascii_control()) {
            return Err(BucketError::InvalidKey);
        }
        Ok(())
    }

    /// Construct the physical payload path for a key.
    ///
    /// Uses MD5(key); the first two bytes become a two-level shard prefix
    /// (00–ff) to keep per-directory file counts down, and the full digest is
    /// the filename. Parent directories may not exist yet.
    fn object_path(&self, key: &str) -> PathBuf {
        let digest = md5::compute(key);
        let mut path = self.base_path.clone();
        path.push(format!("{:02x}", digest[0]));
        path.push(format!("{:02x}", digest[1]));
        path.push(format!("{:x}", digest));
        path
    }

    /// Fetch the metadata row for a key, if any.
    async fn fetch_record(&self, key: &str) -> BucketResult<Option<ObjectRecord>> {
        let record = sqlx::query_as::<_, ObjectRecord>(
            "SELECT key, original_name, content_type, size_bytes, etag, uploaded_at
             FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;
        Ok(record)
    }

    /// Recursively remove empty shard directories up to the base path.
    ///
    /// Stops on the first non-empty or missing directory, or on any
    /// unexpected I/O error.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
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
impl Bucket for FsBucket {
    /// Stream the payload to disk and upsert the metadata row.
    ///
    /// - Writes bytes incrementally to a temporary file.
    /// - Computes MD5/etag and size while streaming.
    /// - Atomically renames into the final location.
    /// - Upserts the metadata row (last-write-wins overwrite semantics).
    ///
    /// Ensures durable writes (fsync) and cleans up temp files on errors.
    async fn put(&self, key: &str, body: ByteStream, opts: PutOptions) -> BucketResult<()> {
        self.ensure_key_safe(key)?;

        let file_path = self.object_path(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            BucketError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        let mut body = body;
        while let Some(chunk_res) = body.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(BucketError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(BucketError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BucketError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BucketError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(BucketError::Io(err));
            }
        }

        let etag = format!("{:x}", digest.compute());

        let insert_result = sqlx::query(
            r#"
            INSERT INTO objects (key, original_name, content_type, size_bytes, etag, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                original_name = excluded.original_name,
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                uploaded_at = excluded.uploaded_at
            "#,
        )
        .bind(key)
        .bind(&opts.meta.original_name)
        .bind(opts.content_type.clone())
        .bind(size_bytes)
        .bind(&etag)
        .bind(&opts.meta.uploaded_at)
        .execute(&*self.db)
        .await;

        match insert_result {
            Ok(_) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(BucketError::Sqlx(err))
            }
        }
    }

    /// Fetch an object for reading.
    ///
    /// Returns metadata and a payload stream. A missing metadata row, a row
    /// whose physical file has vanished, or a key that could never have been
    /// stored all read as `None`.
    async fn get(&self, key: &str) -> BucketResult<Option<StoredObject>> {
        if self.ensure_key_safe(key).is_err() {
            return Ok(None);
        }
        let Some(record) = self.fetch_record(key).await? else {
            return Ok(None);
        };

        let file_path = self.object_path(key);
        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload missing for key `{}`", key);
                return Ok(None);
            }
            Err(err) => return Err(BucketError::Io(err)),
        };

        Ok(Some(StoredObject {
            content_type: record.content_type,
            etag: record.etag,
            original_name: Some(record.original_name),
            size_bytes: record.size_bytes,
            body: ReaderStream::new(file).boxed(),
        }))
    }

    /// Delete the metadata row and the payload.
    ///
    /// Idempotent: a missing row, a missing file, or a key that could never
    /// have been stored are all no-ops. Emptied shard directories are pruned
    /// afterwards.
    async fn delete(&self, key: &str) -> BucketResult<()> {
        if self.ensure_key_safe(key).is_err() {
            return Ok(());
        }

        sqlx::query("DELETE FROM objects WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed payload file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload file {} already missing", file_path.display());
            }
            Err(err) => return Err(BucketError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }

        Ok(())
    }

    /// Full listing of metadata rows, ordered by key.
    async fn list(&self) -> BucketResult<Vec<ListedObject>> {
        let records = sqlx::query_as::<_, ObjectRecord>(
            "SELECT key, original_name, content_type, size_bytes, etag, uploaded_at
             FROM objects ORDER BY key ASC",
        )
        .fetch_all(&*self.db)
        .await?;

        Ok(records
            .into_iter()
            .map(|record| ListedObject {
                key: record.key,
                size_bytes: record.size_bytes,
                uploaded_at: record.uploaded_at,
            })
            .collect())
    }
}
