//! Collaborator contracts the entry model is built against.
//!
//! [`EntryIo`] answers questions about a locator (does it exist, what bytes,
//! which children); [`UnderlyingFileSystem`] performs physical mutations.
//! [`VfsStorage`](crate::vfs::VfsStorage) implements both over the storage
//! backends, and tests substitute small doubles.

use async_trait::async_trait;
use fsaccess_types::{FileSystemLocator, HandleKind};
use std::time::SystemTime;

use crate::entry::FileSystemEntry;
use crate::vfs::VfsResult;

/// Read side of the storage collaborator.
#[async_trait]
pub trait EntryIo: Send + Sync {
    /// Kind of the node at `locator`, or `None` if nothing is there.
    async fn locate(&self, locator: &FileSystemLocator) -> VfsResult<Option<HandleKind>>;

    /// Full contents of the file at `locator`.
    async fn binary_data(&self, locator: &FileSystemLocator) -> VfsResult<Vec<u8>>;

    /// Last modification time of the file at `locator`.
    async fn modification_timestamp(&self, locator: &FileSystemLocator) -> VfsResult<SystemTime>;

    /// Locators of the directory's children, in storage order.
    async fn children(&self, locator: &FileSystemLocator) -> VfsResult<Vec<FileSystemLocator>>;
}

/// Mutation side of the storage collaborator.
///
/// Errors are handed to the handle operation's caller unmodified.
#[async_trait]
pub trait UnderlyingFileSystem: Send + Sync {
    /// Physically create `entry` inside the directory at `parent`.
    async fn create(&self, entry: &FileSystemEntry, parent: &FileSystemLocator) -> VfsResult<()>;

    /// Physically remove `entry` (recursively for directories) from `parent`.
    async fn remove(&self, entry: &FileSystemEntry, parent: &FileSystemLocator) -> VfsResult<()>;

    /// Replace the contents of the file at `locator`.
    async fn write(&self, locator: &FileSystemLocator, data: &[u8]) -> VfsResult<()>;
}
