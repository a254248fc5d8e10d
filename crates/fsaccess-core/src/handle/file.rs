//! File handles.

use fsaccess_types::{AccessMode, FileSystemLocator, LockKind};
use std::ops::Deref;

use super::{entry_with_access, AccessStep, FileSystemHandle};
use crate::entry::FileEntry;
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;
use crate::snapshot::File;
use crate::sync_access::FileSystemSyncAccessHandle;
use crate::writable::FileSystemWritableFileStream;

/// Options for [`FileSystemFileHandle::create_writable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateWritableOptions {
    /// Start from the file's current contents instead of an empty buffer.
    pub keep_existing_data: bool,
}

/// Handle to a file.
#[derive(Clone)]
pub struct FileSystemFileHandle {
    handle: FileSystemHandle,
}

impl std::fmt::Debug for FileSystemFileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FileSystemFileHandle")
            .field(self.handle.locator())
            .finish()
    }
}

impl Deref for FileSystemFileHandle {
    type Target = FileSystemHandle;

    fn deref(&self) -> &FileSystemHandle {
        &self.handle
    }
}

impl FileSystemFileHandle {
    pub(crate) fn new(locator: FileSystemLocator, fs: FileSystem) -> Self {
        Self {
            handle: FileSystemHandle::new(locator, fs),
        }
    }

    pub fn as_handle(&self) -> &FileSystemHandle {
        &self.handle
    }

    /// Snapshot of the file's contents and modification time.
    #[tracing::instrument(skip(self), fields(locator = %self.locator()))]
    pub async fn get_file(&self) -> FsResult<File> {
        let fs = self.file_system().clone();
        let locator = self.locator().clone();
        self.file_system()
            .queue()
            .run(move || snapshot(fs, locator))
            .await?
    }

    /// Open a writable stream over a private copy of the file.
    ///
    /// Holds a shared lock on the file until the stream is closed, aborted
    /// or dropped.
    #[tracing::instrument(skip(self), fields(locator = %self.locator()))]
    pub async fn create_writable(
        &self,
        options: CreateWritableOptions,
    ) -> FsResult<FileSystemWritableFileStream> {
        let fs = self.file_system().clone();
        let locator = self.locator().clone();
        self.file_system()
            .queue()
            .run(move || open_writable(fs, locator, options))
            .await?
    }

    /// Open a synchronous, exclusive read/write handle on the file.
    #[tracing::instrument(skip(self), fields(locator = %self.locator()))]
    pub async fn create_sync_access_handle(&self) -> FsResult<FileSystemSyncAccessHandle> {
        let fs = self.file_system().clone();
        let locator = self.locator().clone();
        self.file_system()
            .queue()
            .run(move || open_sync_access(fs, locator))
            .await?
    }
}

async fn snapshot(fs: FileSystem, locator: FileSystemLocator) -> FsResult<File> {
    let mut file = file_entry(&fs, &locator, AccessStep::Query(AccessMode::Read)).await?;
    let last_modified = file.modification_timestamp().await?;
    let bytes = file.binary_data().await?.to_vec();
    let name = locator.name().to_string();
    Ok(File::new(name, bytes, last_modified, locator, fs))
}

async fn open_writable(
    fs: FileSystem,
    locator: FileSystemLocator,
    options: CreateWritableOptions,
) -> FsResult<FileSystemWritableFileStream> {
    let step = AccessStep::Request(AccessMode::Readwrite);
    let mut file = file_entry(&fs, &locator, step).await?;

    if !file.take_lock(LockKind::Shared).is_success() {
        return Err(FsError::lock_conflict(&locator));
    }

    let buffer = if options.keep_existing_data {
        match file.binary_data().await {
            Ok(data) => data.to_vec(),
            Err(e) => {
                file.release_lock();
                return Err(e);
            }
        }
    } else {
        Vec::new()
    };
    Ok(FileSystemWritableFileStream::new(locator, fs, buffer))
}

async fn open_sync_access(
    fs: FileSystem,
    locator: FileSystemLocator,
) -> FsResult<FileSystemSyncAccessHandle> {
    let step = AccessStep::Request(AccessMode::Readwrite);
    let mut file = file_entry(&fs, &locator, step).await?;

    if fs.options().sync_access_bucket_only && !locator.is_in_bucket_file_system() {
        return Err(FsError::invalid_state(format!(
            "{locator} is not in a bucket file system"
        )));
    }

    if !file.take_lock(LockKind::Exclusive).is_success() {
        return Err(FsError::lock_conflict(&locator));
    }

    let data = match file.binary_data().await {
        Ok(data) => data.to_vec(),
        Err(e) => {
            file.release_lock();
            return Err(e);
        }
    };
    Ok(FileSystemSyncAccessHandle::new(locator, fs, data))
}

/// The file entry at `locator`, after the access step.
async fn file_entry(
    fs: &FileSystem,
    locator: &FileSystemLocator,
    step: AccessStep,
) -> FsResult<FileEntry> {
    entry_with_access(fs.ctx(), locator, step)
        .await?
        .into_file()
        .ok_or_else(|| FsError::type_mismatch(locator.to_string()))
}
