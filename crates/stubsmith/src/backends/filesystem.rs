use super::{BlobError, BlobStore, StreamSource};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Blob store backed by a directory on disk
#[derive(Debug, Clone)]
pub struct FileSystemBlobStore {
    root: PathBuf,
}

impl FileSystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a blob name onto a path below the root, refusing escapes
    fn resolve(&self, name: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(name);
        if name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(BlobError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FileSystemBlobStore {
    async fn stream_source(&self, name: &str) -> Result<StreamSource, BlobError> {
        let path = self.resolve(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                debug!("Resolved blob {} to {:?}", name, path);
                Ok(StreamSource::File {
                    name: name.to_string(),
                    path,
                })
            }
            Ok(_) => Err(BlobError::NotFound(name.to_string())),
            Err(e) => Err(BlobError::io(name, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FileSystemBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        let store = FileSystemBlobStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_reads_file_below_root() {
        let (_dir, store) = store_with(&[("greeting.txt", "hello"), ("nested/a.json", "{}")]);
        assert_eq!(store.read_all("greeting.txt").await.unwrap(), "hello");
        assert_eq!(store.read_all("nested/a.json").await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.stream_source("nope.txt").await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_blob() {
        let (_dir, store) = store_with(&[("nested/a.json", "{}")]);
        assert!(matches!(
            store.stream_source("nested").await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_path_escape() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.stream_source("../etc/passwd").await,
            Err(BlobError::InvalidName(_))
        ));
        assert!(matches!(
            store.stream_source("/etc/passwd").await,
            Err(BlobError::InvalidName(_))
        ));
        assert!(matches!(
            store.stream_source("").await,
            Err(BlobError::InvalidName(_))
        ));
    }
}
