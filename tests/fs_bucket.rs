//! Tests for the filesystem-backed bucket: SQLite metadata plus sharded
//! on-disk payloads, driven through the `Bucket` trait.

use attachment_gateway::services::{
    bucket::{Bucket, BucketError, ByteStream, ObjectMeta, PutOptions},
    fs_bucket::FsBucket,
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup() -> (FsBucket, TempDir) {
    // A pool of one connection so the in-memory database is shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    for stmt in include_str!("../migrations/0001_init.sql")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        sqlx::query(stmt).execute(&pool).await.unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let bucket = FsBucket::new(Arc::new(pool), dir.path());
    (bucket, dir)
}

fn byte_stream(data: &[u8]) -> ByteStream {
    let data = Bytes::copy_from_slice(data);
    stream::once(async move { Ok(data) }).boxed()
}

fn put_options(name: &str, content_type: &str, size: usize) -> PutOptions {
    PutOptions {
        content_type: Some(content_type.to_string()),
        meta: ObjectMeta {
            original_name: name.to_string(),
            size: size.to_string(),
            uploaded_at: "2026-08-30T10:00:00.000Z".to_string(),
        },
    }
}

async fn read_all(mut body: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

#[tokio::test]
async fn put_then_get_roundtrip() {
    let (bucket, _dir) = setup().await;
    let data = b"hello attachment";

    bucket
        .put(
            "k1",
            byte_stream(data),
            put_options("hello.txt", "text/plain", data.len()),
        )
        .await
        .unwrap();

    let object = bucket.get("k1").await.unwrap().expect("object stored");
    assert_eq!(object.content_type.as_deref(), Some("text/plain"));
    assert_eq!(object.original_name.as_deref(), Some("hello.txt"));
    assert_eq!(object.size_bytes, data.len() as i64);
    assert_eq!(
        object.etag.as_deref(),
        Some(format!("{:x}", md5::compute(data)).as_str())
    );
    assert_eq!(read_all(object.body).await, data);
}

#[tokio::test]
async fn overwrite_replaces_payload_and_metadata() {
    let (bucket, _dir) = setup().await;

    bucket
        .put(
            "k1",
            byte_stream(b"first"),
            put_options("v1.txt", "text/plain", 5),
        )
        .await
        .unwrap();
    bucket
        .put(
            "k1",
            byte_stream(b"second version"),
            put_options("v2.json", "application/json", 14),
        )
        .await
        .unwrap();

    let object = bucket.get("k1").await.unwrap().expect("object stored");
    assert_eq!(object.content_type.as_deref(), Some("application/json"));
    assert_eq!(object.original_name.as_deref(), Some("v2.json"));
    assert_eq!(object.size_bytes, 14);
    assert_eq!(read_all(object.body).await, b"second version");

    let listing = bucket.list().await.unwrap();
    assert_eq!(listing.len(), 1);
}

#[tokio::test]
async fn get_of_missing_key_is_none() {
    let (bucket, _dir) = setup().await;
    assert!(bucket.get("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (bucket, _dir) = setup().await;

    bucket
        .put("k1", byte_stream(b"data"), put_options("a.txt", "text/plain", 4))
        .await
        .unwrap();

    bucket.delete("k1").await.unwrap();
    assert!(bucket.get("k1").await.unwrap().is_none());

    // Second delete of the same key, and of a never-stored key, both succeed.
    bucket.delete("k1").await.unwrap();
    bucket.delete("never-stored").await.unwrap();
}

#[tokio::test]
async fn delete_prunes_empty_shard_directories() {
    let (bucket, dir) = setup().await;

    bucket
        .put("k1", byte_stream(b"data"), put_options("a.txt", "text/plain", 4))
        .await
        .unwrap();
    bucket.delete("k1").await.unwrap();

    let mut entries = std::fs::read_dir(dir.path()).unwrap();
    assert!(entries.next().is_none(), "shard directories left behind");
}

#[tokio::test]
async fn list_returns_all_objects_in_key_order() {
    let (bucket, _dir) = setup().await;

    for (key, data) in [("b-key", &b"bb"[..]), ("a-key", &b"a"[..]), ("c-key", &b"ccc"[..])] {
        bucket
            .put(
                key,
                byte_stream(data),
                put_options("f.bin", "application/octet-stream", data.len()),
            )
            .await
            .unwrap();
    }

    let listing = bucket.list().await.unwrap();
    let keys: Vec<&str> = listing.iter().map(|obj| obj.key.as_str()).collect();
    assert_eq!(keys, ["a-key", "b-key", "c-key"]);
    assert_eq!(listing[0].size_bytes, 1);
    assert_eq!(listing[0].uploaded_at, "2026-08-30T10:00:00.000Z");
}

#[tokio::test]
async fn keys_are_opaque_strings() {
    let (bucket, _dir) = setup().await;
    let key = "items/αβ/my file (final).pdf";

    bucket
        .put(
            key,
            byte_stream(b"pdf bytes"),
            put_options("my file (final).pdf", "application/pdf", 9),
        )
        .await
        .unwrap();

    let object = bucket.get(key).await.unwrap().expect("object stored");
    assert_eq!(read_all(object.body).await, b"pdf bytes");
}

#[tokio::test]
async fn degenerate_keys_are_rejected() {
    let (bucket, _dir) = setup().await;

    let err = bucket
        .put("", byte_stream(b"x"), put_options("x", "text/plain", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, BucketError::InvalidKey));

    let err = bucket
        .put(
            "bad\nkey",
            byte_stream(b"x"),
            put_options("x", "text/plain", 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BucketError::InvalidKey));
}

#[tokio::test]
async fn degenerate_keys_read_as_absent() {
    let (bucket, _dir) = setup().await;

    // Keys that could never have been stored are not errors on the read and
    // delete paths: the first reads as missing, the second is a no-op.
    assert!(bucket.get("bad\nkey").await.unwrap().is_none());
    assert!(bucket.get("").await.unwrap().is_none());
    bucket.delete("bad\nkey").await.unwrap();
    bucket.delete("").await.unwrap();
}
