//! Metadata record for a stored attachment.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of attachment metadata, keyed by the object key.
///
/// The record describes a stored blob; the payload bytes live on disk under
/// a path derived from the key hash, never in the database.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ObjectRecord {
    /// Unique object key. Doubles as part of the public download URL.
    pub key: String,

    /// Original filename supplied at upload time.
    pub original_name: String,

    /// Content type (MIME type) declared by the upload, if any.
    pub content_type: Option<String>,

    /// Payload size in bytes, measured while streaming to disk.
    pub size_bytes: i64,

    /// MD5 checksum of the payload, used as the download etag.
    pub etag: Option<String>,

    /// ISO-8601 upload timestamp, stored verbatim.
    pub uploaded_at: String,
}
