//! services/api/src/adapters/files.rs
//!
//! Local-disk implementation of the `FileStore` port. Uploaded book
//! content and cover images live under a single root directory and are
//! addressed by the `/uploads/...` path recorded on the book row, which is
//! also the path they are served back under.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use bookbarter_core::ports::{FileStore, PortError, PortResult};

/// A file store adapter that writes to the configured upload directory.
#[derive(Clone)]
pub struct DiskFileStore {
    root: PathBuf,
}

impl DiskFileStore {
    /// Creates a new `DiskFileStore` rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a stored `/uploads/...` reference onto the disk root. Rejects
    /// anything that could escape it.
    fn resolve(&self, relative_path: &str) -> PortResult<PathBuf> {
        let trimmed = relative_path
            .strip_prefix("/uploads/")
            .or_else(|| relative_path.strip_prefix("uploads/"))
            .unwrap_or(relative_path)
            .trim_start_matches('/');

        if trimmed.is_empty() || Path::new(trimmed).components().any(|c| c.as_os_str() == "..") {
            return Err(PortError::Unexpected(format!(
                "invalid upload path: '{relative_path}'"
            )));
        }

        Ok(self.root.join(trimmed))
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn save(&self, relative_path: &str, bytes: &[u8]) -> PortResult<()> {
        let path = self.resolve(relative_path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn delete(&self, relative_path: &str) -> PortResult<()> {
        let path = self.resolve(relative_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // A file already removed out-of-band is not a failure.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_strips_the_uploads_prefix() {
        let store = DiskFileStore::new("/var/data/uploads");
        let path = store.resolve("/uploads/books/abc.pdf").unwrap();
        assert_eq!(path, PathBuf::from("/var/data/uploads/books/abc.pdf"));
    }

    #[test]
    fn resolve_rejects_traversal() {
        let store = DiskFileStore::new("/var/data/uploads");
        assert!(store.resolve("/uploads/../etc/passwd").is_err());
        assert!(store.resolve("").is_err());
    }
}
