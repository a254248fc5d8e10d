//! Storage backend operations trait.
//!
//! Path-based, no inodes. Paths are always relative to the backend's root;
//! [`VfsStorage`](super::VfsStorage) translates locators into them.

use async_trait::async_trait;
use std::path::Path;

use super::types::{DirEntry, FileAttr};
use super::VfsResult;

/// Core storage backend operations.
#[async_trait]
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Get node attributes.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Read directory entries, in the order the backend enumerates them.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Read up to `size` bytes starting at `offset`.
    ///
    /// Returns fewer bytes if EOF is reached.
    async fn read(&self, path: &Path, offset: u64, size: u64) -> VfsResult<Vec<u8>>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write `data` at `offset`, extending the file if needed.
    ///
    /// Returns the number of bytes written.
    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u64>;

    /// Create a new, empty file. Fails if something already exists there.
    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Create a new directory.
    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Remove a file.
    async fn unlink(&self, path: &Path) -> VfsResult<()>;

    /// Remove an empty directory.
    async fn rmdir(&self, path: &Path) -> VfsResult<()>;

    /// Truncate or extend a file to `size` bytes.
    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Returns true if this backend is read-only.
    fn read_only(&self) -> bool;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Read entire file contents.
    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let attr = self.getattr(path).await?;
        self.read(path, 0, attr.size).await
    }

    /// Replace entire file contents, creating the file if needed.
    async fn write_all(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        if self.exists(path).await {
            self.truncate(path, 0).await?;
        } else {
            self.create(path, 0o644).await?;
        }
        self.write(path, 0, data).await?;
        Ok(())
    }

    /// Remove a file, or a directory and everything below it.
    async fn remove_all(&self, path: &Path) -> VfsResult<()> {
        let attr = self.getattr(path).await?;
        if !attr.is_dir() {
            return self.unlink(path).await;
        }

        for entry in self.readdir(path).await? {
            let child = path.join(&entry.name);
            if entry.kind.is_dir() {
                self.remove_all(&child).await?;
            } else {
                self.unlink(&child).await?;
            }
        }
        self.rmdir(path).await
    }
}
