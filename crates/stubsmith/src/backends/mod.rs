//! Blob stores holding body files and script sources.
//!
//! Only the read contract is needed by the render pipeline: look a name up,
//! get back a lazily opened byte stream, or read the content in full.

mod filesystem;
mod inmemory;

pub use filesystem::FileSystemBlobStore;
pub use inmemory::InMemoryBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use tokio_util::io::ReaderStream;

/// Chunks of a body as they are read
pub type BodyStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid file name: {0}")]
    InvalidName(String),
    #[error("Failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    fn io(name: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            BlobError::NotFound(name.to_string())
        } else {
            BlobError::Io {
                name: name.to_string(),
                source,
            }
        }
    }
}

/// Handle to blob content that has not been read yet
#[derive(Debug, Clone)]
pub enum StreamSource {
    File { name: String, path: PathBuf },
    Memory(Bytes),
}

impl StreamSource {
    pub fn memory(content: impl Into<Bytes>) -> Self {
        StreamSource::Memory(content.into())
    }

    /// Open the content as a stream of chunks
    pub async fn open(&self) -> Result<BodyStream, BlobError> {
        match self {
            StreamSource::File { name, path } => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| BlobError::io(name, e))?;
                Ok(ReaderStream::new(file).boxed())
            }
            StreamSource::Memory(bytes) => {
                let bytes = bytes.clone();
                Ok(stream::once(async move { Ok::<_, std::io::Error>(bytes) }).boxed())
            }
        }
    }

    pub async fn read_all(&self) -> Result<Bytes, BlobError> {
        match self {
            StreamSource::File { name, path } => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| BlobError::io(name, e)),
            StreamSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Read-only, name-addressed content store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look up `name` without reading it; missing names are an error
    async fn stream_source(&self, name: &str) -> Result<StreamSource, BlobError>;

    /// Read the full content of `name`
    async fn read_all(&self, name: &str) -> Result<Bytes, BlobError> {
        self.stream_source(name).await?.read_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source_streams_single_chunk() {
        let source = StreamSource::memory("chunk");
        let chunks: Vec<_> = source.open().await.unwrap().collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &Bytes::from("chunk"));
    }

    #[tokio::test]
    async fn test_missing_file_maps_to_not_found() {
        let source = StreamSource::File {
            name: "gone.txt".into(),
            path: PathBuf::from("/definitely/not/here/gone.txt"),
        };
        assert!(matches!(
            source.read_all().await,
            Err(BlobError::NotFound(name)) if name == "gone.txt"
        ));
    }
}
