use super::{BlobError, BlobStore, StreamSource};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory blob store
///
/// Useful for embedding and tests. Every lookup is counted per name so callers
/// can check how often content was fetched.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
    lookups: RwLock<HashMap<String, usize>>,
    total_lookups: AtomicUsize,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(self, name: &str, content: impl Into<Bytes>) -> Self {
        self.put(name, content);
        self
    }

    pub fn put(&self, name: &str, content: impl Into<Bytes>) {
        self.blobs.write().insert(name.to_string(), content.into());
    }

    /// Number of times `name` was looked up
    pub fn lookups(&self, name: &str) -> usize {
        self.lookups.read().get(name).copied().unwrap_or(0)
    }

    pub fn total_lookups(&self) -> usize {
        self.total_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn stream_source(&self, name: &str) -> Result<StreamSource, BlobError> {
        *self.lookups.write().entry(name.to_string()).or_insert(0) += 1;
        self.total_lookups.fetch_add(1, Ordering::Relaxed);
        self.blobs
            .read()
            .get(name)
            .cloned()
            .map(StreamSource::Memory)
            .ok_or_else(|| BlobError::NotFound(name.to_string()))
    }
}
