//! In-memory bucket used to exercise the gateway without touching disk.

use crate::services::bucket::{
    Bucket, BucketError, BucketResult, ByteStream, ListedObject, PutOptions, StoredObject,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

#[derive(Clone, Debug)]
struct MemoryEntry {
    data: Bytes,
    content_type: Option<String>,
    original_name: String,
    uploaded_at: String,
    etag: String,
}

/// Bucket backed by a `BTreeMap` behind a mutex. Listing order is key order.
#[derive(Clone, Default)]
pub struct MemoryBucket {
    entries: Arc<Mutex<BTreeMap<String, MemoryEntry>>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("bucket lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    async fn put(&self, key: &str, body: ByteStream, opts: PutOptions) -> BucketResult<()> {
        if key.is_empty() {
            return Err(BucketError::InvalidKey);
        }

        let mut data = Vec::new();
        let mut body = body;
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }

        let entry = MemoryEntry {
            etag: format!("{:x}", md5::compute(&data)),
            data: Bytes::from(data),
            content_type: opts.content_type,
            original_name: opts.meta.original_name,
            uploaded_at: opts.meta.uploaded_at,
        };

        self.entries
            .lock()
            .expect("bucket lock poisoned")
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> BucketResult<Option<StoredObject>> {
        let entry = {
            let entries = self.entries.lock().expect("bucket lock poisoned");
            entries.get(key).cloned()
        };

        Ok(entry.map(|entry| StoredObject {
            content_type: entry.content_type,
            etag: Some(entry.etag),
            original_name: Some(entry.original_name),
            size_bytes: entry.data.len() as i64,
            body: stream::once(async move { Ok(entry.data) }).boxed(),
        }))
    }

    async fn delete(&self, key: &str) -> BucketResult<()> {
        self.entries
            .lock()
            .expect("bucket lock poisoned")
            .remove(key);
        Ok(())
    }

    async fn list(&self) -> BucketResult<Vec<ListedObject>> {
        let entries = self.entries.lock().expect("bucket lock poisoned");
        Ok(entries
            .iter()
            .map(|(key, entry)| ListedObject {
                key: key.clone(),
                size_bytes: entry.data.len() as i64,
                uploaded_at: entry.uploaded_at.clone(),
            })
            .collect())
    }
}
