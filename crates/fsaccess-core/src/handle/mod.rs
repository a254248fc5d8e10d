//! Handles: the public API over locators.
//!
//! A handle is a locator plus the [`FileSystem`] it belongs to. It does not
//! own or cache an entry; every operation resolves the locator again inside
//! one turn of the file system queue.

mod directory;
mod file;

pub use directory::{
    DirectoryIterator, FileSystemDirectoryHandle, GetDirectoryOptions, GetFileOptions,
    RemoveOptions,
};
pub use file::{CreateWritableOptions, FileSystemFileHandle};

use fsaccess_types::{is_same_locator, AccessMode, FileSystemLocator, HandleKind, PermissionState};
use std::fmt;

use crate::entry::{locate_entry, EntryContext, FileSystemEntry};
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;

/// Kind-agnostic part of every handle.
#[derive(Clone)]
pub struct FileSystemHandle {
    locator: FileSystemLocator,
    fs: FileSystem,
}

impl fmt::Debug for FileSystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileSystemHandle").field(&self.locator).finish()
    }
}

impl FileSystemHandle {
    pub(crate) fn new(locator: FileSystemLocator, fs: FileSystem) -> Self {
        Self { locator, fs }
    }

    pub fn kind(&self) -> HandleKind {
        self.locator.kind()
    }

    /// Last path segment (empty for a root).
    pub fn name(&self) -> &str {
        self.locator.name()
    }

    pub fn locator(&self) -> &FileSystemLocator {
        &self.locator
    }

    pub fn file_system(&self) -> &FileSystem {
        &self.fs
    }

    /// Whether both handles denote the same entry.
    pub async fn is_same_entry(&self, other: &FileSystemHandle) -> FsResult<bool> {
        let (a, b) = (self.locator.clone(), other.locator.clone());
        self.fs
            .queue()
            .run(move || async move { is_same_locator(&a, &b) })
            .await
    }

    pub async fn query_permission(&self, mode: AccessMode) -> FsResult<PermissionState> {
        let ctx = self.fs.ctx().clone();
        let locator = self.locator.clone();
        self.fs
            .queue()
            .run(move || async move {
                ctx.access.query_access(&locator, mode).await.permission_state
            })
            .await
    }

    pub async fn request_permission(&self, mode: AccessMode) -> FsResult<PermissionState> {
        let ctx = self.fs.ctx().clone();
        let locator = self.locator.clone();
        self.fs
            .queue()
            .run(move || async move {
                ctx.access.request_access(&locator, mode).await.permission_state
            })
            .await
    }
}

/// A file or directory handle, as produced by iteration.
#[derive(Debug, Clone)]
pub enum EntryHandle {
    File(FileSystemFileHandle),
    Directory(FileSystemDirectoryHandle),
}

impl EntryHandle {
    pub fn as_handle(&self) -> &FileSystemHandle {
        match self {
            EntryHandle::File(h) => h.as_handle(),
            EntryHandle::Directory(h) => h.as_handle(),
        }
    }

    pub fn kind(&self) -> HandleKind {
        self.as_handle().kind()
    }

    pub fn name(&self) -> &str {
        self.as_handle().name()
    }

    pub fn into_file(self) -> Option<FileSystemFileHandle> {
        match self {
            EntryHandle::File(h) => Some(h),
            EntryHandle::Directory(_) => None,
        }
    }

    pub fn into_directory(self) -> Option<FileSystemDirectoryHandle> {
        match self {
            EntryHandle::Directory(h) => Some(h),
            EntryHandle::File(_) => None,
        }
    }
}

impl From<FileSystemFileHandle> for EntryHandle {
    fn from(h: FileSystemFileHandle) -> Self {
        EntryHandle::File(h)
    }
}

impl From<FileSystemDirectoryHandle> for EntryHandle {
    fn from(h: FileSystemDirectoryHandle) -> Self {
        EntryHandle::Directory(h)
    }
}

/// Which access step an algorithm opens with.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AccessStep {
    Query(AccessMode),
    Request(AccessMode),
}

/// Resolve `locator`, check access, and fail if nothing is there.
///
/// Access is checked on the resolved entry; a missing entry is reported as
/// not found without consulting access control.
pub(crate) async fn entry_with_access(
    ctx: &EntryContext,
    locator: &FileSystemLocator,
    step: AccessStep,
) -> FsResult<FileSystemEntry> {
    let entry = locate_entry(locator, ctx)
        .await?
        .ok_or_else(|| FsError::not_found(locator.to_string()))?;

    let access = match step {
        AccessStep::Query(mode) => entry.query_access(mode).await,
        AccessStep::Request(mode) => entry.request_access(mode).await,
    };
    if !access.is_granted() {
        tracing::debug!(%locator, ?step, state = %access.permission_state, "access not granted");
        return Err(FsError::access_denied(access.error_name));
    }
    Ok(entry)
}
