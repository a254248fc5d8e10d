//! The entry model.
//!
//! An entry is the backing object a locator resolves to *at a point in
//! time*. Entries are built fresh by [`locate_entry`] on every algorithm;
//! they memoize what they have fetched for the duration of that algorithm
//! and nothing longer. The lock of a file entry is the exception: it lives
//! in the file system's [`LockTable`], keyed by locator, so it outlasts the
//! entry value.

use fsaccess_types::{
    AccessMode, AccessResult, FileLock, FileSystemLocator, HandleKind, LockKind, LockResult,
};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::access::AccessControl;
use crate::error::{FsError, FsResult};
use crate::io::{EntryIo, UnderlyingFileSystem};
use crate::lock_table::LockTable;

/// Collaborators every entry talks to.
#[derive(Clone)]
pub struct EntryContext {
    pub(crate) io: Arc<dyn EntryIo>,
    pub(crate) storage: Arc<dyn UnderlyingFileSystem>,
    pub(crate) access: Arc<dyn AccessControl>,
    pub(crate) locks: Arc<LockTable>,
}

impl fmt::Debug for EntryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryContext")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl EntryContext {
    pub fn new(
        io: Arc<dyn EntryIo>,
        storage: Arc<dyn UnderlyingFileSystem>,
        access: Arc<dyn AccessControl>,
    ) -> Self {
        Self {
            io,
            storage,
            access,
            locks: Arc::new(LockTable::new()),
        }
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }
}

/// Resolve `locator` to an entry of the kind it names.
///
/// `None` when nothing is there, or when the node there is of the other
/// kind.
pub async fn locate_entry(
    locator: &FileSystemLocator,
    ctx: &EntryContext,
) -> FsResult<Option<FileSystemEntry>> {
    let found = ctx.io.locate(locator).await?;
    if found != Some(locator.kind()) {
        tracing::debug!(%locator, ?found, "locate: no entry");
        return Ok(None);
    }
    Ok(Some(FileSystemEntry::from_locator(locator.clone(), ctx.clone())))
}

/// A resolved entry: file or directory.
#[derive(Debug)]
pub enum FileSystemEntry {
    File(FileEntry),
    Directory(DirectoryEntry),
}

impl FileSystemEntry {
    /// Entry for a locator already known to exist, without touching storage.
    pub(crate) fn from_locator(locator: FileSystemLocator, ctx: EntryContext) -> Self {
        match locator.kind() {
            HandleKind::File => FileSystemEntry::File(FileEntry::new(locator, ctx)),
            HandleKind::Directory => FileSystemEntry::Directory(DirectoryEntry::new(locator, ctx)),
        }
    }

    pub fn locator(&self) -> &FileSystemLocator {
        match self {
            FileSystemEntry::File(f) => &f.locator,
            FileSystemEntry::Directory(d) => &d.locator,
        }
    }

    pub fn name(&self) -> &str {
        self.locator().name()
    }

    pub fn kind(&self) -> HandleKind {
        self.locator().kind()
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FileSystemEntry::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileSystemEntry::Directory(_))
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            FileSystemEntry::File(f) => Some(f),
            FileSystemEntry::Directory(_) => None,
        }
    }

    pub fn into_file(self) -> Option<FileEntry> {
        match self {
            FileSystemEntry::File(f) => Some(f),
            FileSystemEntry::Directory(_) => None,
        }
    }

    pub fn into_directory(self) -> Option<DirectoryEntry> {
        match self {
            FileSystemEntry::Directory(d) => Some(d),
            FileSystemEntry::File(_) => None,
        }
    }

    fn ctx(&self) -> &EntryContext {
        match self {
            FileSystemEntry::File(f) => &f.ctx,
            FileSystemEntry::Directory(d) => &d.ctx,
        }
    }

    pub async fn query_access(&self, mode: AccessMode) -> AccessResult {
        self.ctx().access.query_access(self.locator(), mode).await
    }

    pub async fn request_access(&self, mode: AccessMode) -> AccessResult {
        self.ctx().access.request_access(self.locator(), mode).await
    }
}

/// A file entry.
pub struct FileEntry {
    locator: FileSystemLocator,
    ctx: EntryContext,
    binary_data: Option<Vec<u8>>,
    modification_timestamp: Option<SystemTime>,
}

impl fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEntry")
            .field("locator", &self.locator)
            .field("binary_data", &self.binary_data.as_ref().map(Vec::len))
            .field("modification_timestamp", &self.modification_timestamp)
            .finish()
    }
}

impl FileEntry {
    pub(crate) fn new(locator: FileSystemLocator, ctx: EntryContext) -> Self {
        Self {
            locator,
            ctx,
            binary_data: None,
            modification_timestamp: None,
        }
    }

    /// A not-yet-created empty file: contents and timestamp preset.
    pub(crate) fn new_empty(locator: FileSystemLocator, ctx: EntryContext) -> Self {
        Self {
            locator,
            ctx,
            binary_data: Some(Vec::new()),
            modification_timestamp: Some(SystemTime::now()),
        }
    }

    pub fn locator(&self) -> &FileSystemLocator {
        &self.locator
    }

    pub fn name(&self) -> &str {
        self.locator.name()
    }

    /// File contents, fetched on first use.
    pub async fn binary_data(&mut self) -> FsResult<&[u8]> {
        if self.binary_data.is_none() {
            self.binary_data = Some(self.ctx.io.binary_data(&self.locator).await?);
        }
        Ok(self.binary_data.get_or_insert_with(Vec::new))
    }

    /// Contents if already fetched or preset.
    pub fn cached_binary_data(&self) -> Option<&[u8]> {
        self.binary_data.as_deref()
    }

    /// Persist `data` as the file's contents, then cache it.
    pub async fn set_binary_data(&mut self, data: Vec<u8>) -> FsResult<()> {
        self.ctx
            .storage
            .write(&self.locator, &data)
            .await
            .inspect_err(|e| tracing::warn!(locator = %self.locator, error = %e, "write failed"))?;
        self.binary_data = Some(data);
        self.modification_timestamp = None;
        Ok(())
    }

    /// Last modification time, fetched on first use.
    pub async fn modification_timestamp(&mut self) -> FsResult<SystemTime> {
        match self.modification_timestamp {
            Some(ts) => Ok(ts),
            None => {
                let ts = self.ctx.io.modification_timestamp(&self.locator).await?;
                self.modification_timestamp = Some(ts);
                Ok(ts)
            }
        }
    }

    pub fn lock(&self) -> FileLock {
        self.ctx.locks.get(&self.locator)
    }

    pub fn take_lock(&self, kind: LockKind) -> LockResult {
        self.ctx.locks.take(kind, &self.locator)
    }

    pub fn release_lock(&self) {
        self.ctx.locks.release(&self.locator)
    }
}

/// A directory entry.
pub struct DirectoryEntry {
    locator: FileSystemLocator,
    ctx: EntryContext,
    children: Option<Vec<FileSystemEntry>>,
}

impl fmt::Debug for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryEntry")
            .field("locator", &self.locator)
            .field("children", &self.children.as_ref().map(Vec::len))
            .finish()
    }
}

impl DirectoryEntry {
    pub(crate) fn new(locator: FileSystemLocator, ctx: EntryContext) -> Self {
        Self {
            locator,
            ctx,
            children: None,
        }
    }

    /// A not-yet-created empty directory.
    pub(crate) fn new_empty(locator: FileSystemLocator, ctx: EntryContext) -> Self {
        Self {
            locator,
            ctx,
            children: Some(Vec::new()),
        }
    }

    pub fn locator(&self) -> &FileSystemLocator {
        &self.locator
    }

    pub fn name(&self) -> &str {
        self.locator.name()
    }

    /// Children, listed from storage on first use.
    pub async fn children(&mut self) -> FsResult<&mut Vec<FileSystemEntry>> {
        if self.children.is_none() {
            let listed = self.ctx.io.children(&self.locator).await?;
            let entries = listed
                .into_iter()
                .map(|loc| FileSystemEntry::from_locator(loc, self.ctx.clone()))
                .collect();
            self.children = Some(entries);
        }
        Ok(self.children.get_or_insert_with(Vec::new))
    }

    /// Synthesize a new, not-yet-created child of `kind` named `name`.
    pub(crate) fn new_child(&self, kind: HandleKind, name: &str) -> FileSystemEntry {
        let locator = self.locator.child(kind, name);
        match kind {
            HandleKind::File => FileSystemEntry::File(FileEntry::new_empty(locator, self.ctx.clone())),
            HandleKind::Directory => {
                FileSystemEntry::Directory(DirectoryEntry::new_empty(locator, self.ctx.clone()))
            }
        }
    }

    /// Physically create `child` and, only then, record it as a child.
    pub(crate) async fn add_child(&mut self, child: FileSystemEntry) -> FsResult<()> {
        // List first so the new child is not picked up from storage as well.
        self.children().await?;
        self.ctx
            .storage
            .create(&child, &self.locator)
            .await
            .inspect_err(|e| tracing::warn!(locator = %child.locator(), error = %e, "create failed"))?;
        self.children().await?.push(child);
        Ok(())
    }

    /// Physically remove the child at `index` and, only then, forget it.
    pub(crate) async fn remove_child(&mut self, index: usize) -> FsResult<FileSystemEntry> {
        let storage = Arc::clone(&self.ctx.storage);
        let locator = self.locator.clone();
        let children = self.children().await?;
        let child = children
            .get(index)
            .ok_or_else(|| FsError::not_found(format!("{locator} child #{index}")))?;
        storage
            .remove(child, &locator)
            .await
            .inspect_err(|e| tracing::warn!(locator = %child.locator(), error = %e, "remove failed"))?;
        Ok(children.remove(index))
    }
}
