//! The file system facade: collaborators, queue and options in one place.

use fsaccess_types::{FileSystemLocator, HandleKind};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::access::{AccessControl, GrantAll};
use crate::entry::EntryContext;
use crate::handle::{FileSystemDirectoryHandle, FileSystemFileHandle};
use crate::io::{EntryIo, UnderlyingFileSystem};
use crate::lock_table::LockTable;
use crate::queue::FileSystemQueue;

/// Behavior switches of a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FileSystemOptions {
    /// Only files inside a bucket file system may open sync access handles.
    pub sync_access_bucket_only: bool,
    /// Roots whose entry point is the bucket root rather than the plain root.
    pub bucket_roots: HashSet<String>,
}

impl Default for FileSystemOptions {
    fn default() -> Self {
        Self {
            sync_access_bucket_only: true,
            bucket_roots: HashSet::new(),
        }
    }
}

struct Inner {
    ctx: EntryContext,
    queue: FileSystemQueue,
    options: FileSystemOptions,
}

/// Entry point for handles.
///
/// Cheap to clone; every clone shares one queue, one lock table and the same
/// collaborators. Handles keep a clone alive.
#[derive(Clone)]
pub struct FileSystem {
    inner: Arc<Inner>,
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("options", &self.inner.options)
            .field("locks", &self.inner.ctx.locks)
            .finish_non_exhaustive()
    }
}

impl FileSystem {
    /// Start building a file system over `storage`, which serves both the
    /// read and the mutation side.
    pub fn builder<S>(storage: S) -> FileSystemBuilder
    where
        S: EntryIo + UnderlyingFileSystem + 'static,
    {
        FileSystemBuilder::new(Arc::new(storage))
    }

    /// Handle for the file at `path` under `root`.
    pub fn file_handle<S: Into<String>>(
        &self,
        root: impl Into<String>,
        path: impl IntoIterator<Item = S>,
    ) -> FileSystemFileHandle {
        FileSystemFileHandle::new(FileSystemLocator::file(root, path), self.clone())
    }

    /// Handle for the directory at `path` under `root`.
    pub fn directory_handle<S: Into<String>>(
        &self,
        root: impl Into<String>,
        path: impl IntoIterator<Item = S>,
    ) -> FileSystemDirectoryHandle {
        FileSystemDirectoryHandle::new(FileSystemLocator::directory(root, path), self.clone())
    }

    /// Handle for the root directory of the bucket file system `root`.
    pub fn bucket_root(&self, root: impl Into<String>) -> FileSystemDirectoryHandle {
        FileSystemDirectoryHandle::new(FileSystemLocator::bucket_root(root), self.clone())
    }

    /// Entry-point directory of `root`: the bucket root for roots configured
    /// as buckets, the plain root otherwise.
    pub fn root_directory(&self, root: impl Into<String>) -> FileSystemDirectoryHandle {
        let root = root.into();
        if self.inner.options.bucket_roots.contains(&root) {
            self.bucket_root(root)
        } else {
            self.directory_handle(root, Vec::<String>::new())
        }
    }

    /// Handle for an arbitrary locator.
    pub fn handle_for(&self, locator: FileSystemLocator) -> crate::handle::EntryHandle {
        match locator.kind() {
            HandleKind::File => FileSystemFileHandle::new(locator, self.clone()).into(),
            HandleKind::Directory => FileSystemDirectoryHandle::new(locator, self.clone()).into(),
        }
    }

    pub fn options(&self) -> &FileSystemOptions {
        &self.inner.options
    }

    /// Locks currently held on file entries.
    pub fn locks(&self) -> &LockTable {
        &self.inner.ctx.locks
    }

    pub(crate) fn ctx(&self) -> &EntryContext {
        &self.inner.ctx
    }

    pub(crate) fn queue(&self) -> &FileSystemQueue {
        &self.inner.queue
    }
}

/// Builder for [`FileSystem`].
pub struct FileSystemBuilder {
    io: Arc<dyn EntryIo>,
    storage: Arc<dyn UnderlyingFileSystem>,
    access: Arc<dyn AccessControl>,
    options: FileSystemOptions,
}

impl FileSystemBuilder {
    pub fn new<S>(storage: Arc<S>) -> Self
    where
        S: EntryIo + UnderlyingFileSystem + 'static,
    {
        Self {
            io: storage.clone(),
            storage,
            access: Arc::new(GrantAll),
            options: FileSystemOptions::default(),
        }
    }

    /// Builder over separate read and mutation collaborators.
    pub fn from_parts(io: Arc<dyn EntryIo>, storage: Arc<dyn UnderlyingFileSystem>) -> Self {
        Self {
            io,
            storage,
            access: Arc::new(GrantAll),
            options: FileSystemOptions::default(),
        }
    }

    /// Replace the mutation side, keeping the read side.
    pub fn underlying(mut self, storage: Arc<dyn UnderlyingFileSystem>) -> Self {
        self.storage = storage;
        self
    }

    /// Access-control provider (default: [`GrantAll`]).
    pub fn access(mut self, access: impl AccessControl + 'static) -> Self {
        self.access = Arc::new(access);
        self
    }

    pub fn access_arc(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    pub fn sync_access_bucket_only(mut self, enabled: bool) -> Self {
        self.options.sync_access_bucket_only = enabled;
        self
    }

    /// Treat `root` as a bucket file system for [`FileSystem::root_directory`].
    pub fn bucket(mut self, root: impl Into<String>) -> Self {
        self.options.bucket_roots.insert(root.into());
        self
    }

    pub fn options(mut self, options: FileSystemOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the file system and spawn its queue worker.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn build(self) -> FileSystem {
        let ctx = EntryContext::new(self.io, self.storage, self.access);
        FileSystem {
            inner: Arc::new(Inner {
                ctx,
                queue: FileSystemQueue::spawn(),
                options: self.options,
            }),
        }
    }
}
