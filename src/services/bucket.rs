//! The bucket collaborator interface.
//!
//! The gateway itself is stateless; every request performs exactly one
//! primitive operation against a [`Bucket`]. The trait is object-safe and the
//! router carries an `Arc<dyn Bucket>`, so handlers can be exercised against
//! an in-memory bucket in tests and the filesystem-backed one in production.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::{io, sync::Arc};
use thiserror::Error;

/// Byte stream flowing into `put` and out of `get`.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Shared handle passed to every handler as router state.
pub type SharedBucket = Arc<dyn Bucket>;

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("invalid object key")]
    InvalidKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BucketResult<T> = Result<T, BucketError>;

/// Custom string metadata attached to every stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Original filename supplied by the uploader.
    pub original_name: String,
    /// String-encoded payload size in bytes.
    pub size: String,
    /// ISO-8601 upload timestamp.
    pub uploaded_at: String,
}

/// Options carried alongside the byte stream on `put`.
#[derive(Clone, Debug)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub meta: ObjectMeta,
}

/// A stored object as returned by `get`: metadata plus the payload stream.
pub struct StoredObject {
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub original_name: Option<String>,
    pub size_bytes: i64,
    pub body: ByteStream,
}

/// One entry of a full bucket listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedObject {
    pub key: String,
    pub size_bytes: i64,
    pub uploaded_at: String,
}

/// Durable key→blob store with per-key custom metadata.
///
/// Semantics the gateway relies on:
/// - `put` with an existing key overwrites (last write wins);
/// - `get` of an unknown key returns `Ok(None)`, never an error;
/// - `delete` of an unknown key is a no-op;
/// - `list` returns the full listing in one call, in the store's native order.
#[async_trait]
pub trait Bucket: Send + Sync {
    async fn put(&self, key: &str, body: ByteStream, opts: PutOptions) -> BucketResult<()>;

    async fn get(&self, key: &str) -> BucketResult<Option<StoredObject>>;

    async fn delete(&self, key: &str) -> BucketResult<()>;

    async fn list(&self) -> BucketResult<Vec<ListedObject>>;
}
