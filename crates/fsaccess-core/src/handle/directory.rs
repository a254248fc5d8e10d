//! Directory handles and iteration.

use fsaccess_types::{is_valid_file_name, resolve, AccessMode, FileSystemLocator, HandleKind};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use super::{entry_with_access, AccessStep, EntryHandle, FileSystemFileHandle, FileSystemHandle};
use crate::entry::{DirectoryEntry, FileSystemEntry};
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;

/// Options for [`FileSystemDirectoryHandle::get_directory_handle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDirectoryOptions {
    pub create: bool,
}

/// Options for [`FileSystemDirectoryHandle::get_file_handle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GetFileOptions {
    pub create: bool,
}

/// Options for [`FileSystemDirectoryHandle::remove_entry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    pub recursive: bool,
}

/// Handle to a directory.
#[derive(Clone)]
pub struct FileSystemDirectoryHandle {
    handle: FileSystemHandle,
}

impl std::fmt::Debug for FileSystemDirectoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FileSystemDirectoryHandle")
            .field(self.handle.locator())
            .finish()
    }
}

impl Deref for FileSystemDirectoryHandle {
    type Target = FileSystemHandle;

    fn deref(&self) -> &FileSystemHandle {
        &self.handle
    }
}

impl FileSystemDirectoryHandle {
    pub(crate) fn new(locator: FileSystemLocator, fs: FileSystem) -> Self {
        Self {
            handle: FileSystemHandle::new(locator, fs),
        }
    }

    pub fn as_handle(&self) -> &FileSystemHandle {
        &self.handle
    }

    /// Handle to the child directory `name`, creating it if asked to.
    #[tracing::instrument(skip(self), fields(locator = %self.locator()))]
    pub async fn get_directory_handle(
        &self,
        name: &str,
        options: GetDirectoryOptions,
    ) -> FsResult<FileSystemDirectoryHandle> {
        let handle = self
            .get_child(name, HandleKind::Directory, options.create)
            .await?;
        Ok(FileSystemDirectoryHandle::new(handle, self.file_system().clone()))
    }

    /// Handle to the child file `name`, creating it (empty) if asked to.
    #[tracing::instrument(skip(self), fields(locator = %self.locator()))]
    pub async fn get_file_handle(
        &self,
        name: &str,
        options: GetFileOptions,
    ) -> FsResult<FileSystemFileHandle> {
        let handle = self.get_child(name, HandleKind::File, options.create).await?;
        Ok(FileSystemFileHandle::new(handle, self.file_system().clone()))
    }

    async fn get_child(
        &self,
        name: &str,
        kind: HandleKind,
        create: bool,
    ) -> FsResult<FileSystemLocator> {
        let fs = self.file_system().clone();
        let locator = self.locator().clone();
        let name = name.to_string();
        self.file_system()
            .queue()
            .run(move || get_or_create_child(fs, locator, name, kind, create))
            .await?
    }

    /// Remove the child `name`; directories with children need `recursive`.
    #[tracing::instrument(skip(self), fields(locator = %self.locator()))]
    pub async fn remove_entry(&self, name: &str, options: RemoveOptions) -> FsResult<()> {
        let fs = self.file_system().clone();
        let locator = self.locator().clone();
        let name = name.to_string();
        self.file_system()
            .queue()
            .run(move || remove_child(fs, locator, name, options.recursive))
            .await?
    }

    /// Path segments from this directory down to `possible_descendant`, or
    /// `None` if it is not below (or equal to) this directory.
    pub async fn resolve(
        &self,
        possible_descendant: &FileSystemHandle,
    ) -> FsResult<Option<Vec<String>>> {
        let root = self.locator().clone();
        let child = possible_descendant.locator().clone();
        self.file_system()
            .queue()
            .run(move || async move { resolve(&child, &root) })
            .await
    }

    /// Iterator over `(name, handle)` pairs of the children.
    pub fn entries(&self) -> DirectoryIterator {
        DirectoryIterator::new(self.clone())
    }

    /// Child names, as a stream.
    pub fn keys(&self) -> BoxStream<'static, FsResult<String>> {
        self.entries()
            .into_stream()
            .map(|r| r.map(|(name, _)| name))
            .boxed()
    }

    /// Child handles, as a stream.
    pub fn values(&self) -> BoxStream<'static, FsResult<EntryHandle>> {
        self.entries()
            .into_stream()
            .map(|r| r.map(|(_, handle)| handle))
            .boxed()
    }
}

async fn directory_entry(
    fs: &FileSystem,
    locator: &FileSystemLocator,
    step: AccessStep,
) -> FsResult<DirectoryEntry> {
    entry_with_access(fs.ctx(), locator, step)
        .await?
        .into_directory()
        .ok_or_else(|| FsError::type_mismatch(locator.to_string()))
}

async fn get_or_create_child(
    fs: FileSystem,
    locator: FileSystemLocator,
    name: String,
    kind: HandleKind,
    create: bool,
) -> FsResult<FileSystemLocator> {
    if !is_valid_file_name(&name) {
        return Err(FsError::invalid_name(name));
    }

    let step = if create {
        AccessStep::Request(AccessMode::Readwrite)
    } else {
        AccessStep::Query(AccessMode::Read)
    };
    let mut dir = directory_entry(&fs, &locator, step).await?;

    if let Some(child) = dir.children().await?.iter().find(|c| c.name() == name) {
        if child.kind() != kind {
            return Err(FsError::type_mismatch(format!(
                "{name} in {locator} is a {}",
                child.kind()
            )));
        }
        return Ok(child.locator().clone());
    }

    if !create {
        return Err(FsError::not_found(format!("{name} in {locator}")));
    }

    let child = dir.new_child(kind, &name);
    let child_locator = child.locator().clone();
    dir.add_child(child).await?;
    tracing::debug!(locator = %child_locator, "created");
    Ok(child_locator)
}

async fn remove_child(
    fs: FileSystem,
    locator: FileSystemLocator,
    name: String,
    recursive: bool,
) -> FsResult<()> {
    if !is_valid_file_name(&name) {
        return Err(FsError::invalid_name(name));
    }

    let step = AccessStep::Request(AccessMode::Readwrite);
    let mut dir = directory_entry(&fs, &locator, step).await?;

    let children = dir.children().await?;
    let index = children
        .iter()
        .position(|c| c.name() == name)
        .ok_or_else(|| FsError::not_found(format!("{name} in {locator}")))?;

    if let FileSystemEntry::Directory(child) = &mut children[index] {
        if !recursive && !child.children().await?.is_empty() {
            return Err(FsError::invalid_modification(format!(
                "{} is not empty",
                child.locator()
            )));
        }
    }

    let removed = dir.remove_child(index).await?;
    tracing::debug!(locator = %removed.locator(), "removed");
    Ok(())
}

/// Async iterator over a directory's children.
///
/// Each step re-resolves the directory and yields the first child whose name
/// has not been yielded yet, so children added during iteration may appear
/// and removed ones are skipped. A name is never yielded twice.
#[derive(Debug)]
pub struct DirectoryIterator {
    directory: FileSystemDirectoryHandle,
    past_results: Arc<Mutex<HashSet<String>>>,
}

impl DirectoryIterator {
    fn new(directory: FileSystemDirectoryHandle) -> Self {
        Self {
            directory,
            past_results: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Next `(name, handle)` pair, or `None` when every child has been seen.
    pub async fn next(&mut self) -> FsResult<Option<(String, EntryHandle)>> {
        let fs = self.directory.file_system().clone();
        let locator = self.directory.locator().clone();
        let past_results = Arc::clone(&self.past_results);
        self.directory
            .file_system()
            .queue()
            .run(move || next_child(fs, locator, past_results))
            .await?
    }

    /// Drain the iterator into a `Vec`.
    pub async fn collect(mut self) -> FsResult<Vec<(String, EntryHandle)>> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await? {
            out.push(item);
        }
        Ok(out)
    }

    /// Adapt into a stream that ends after the first error.
    pub fn into_stream(self) -> BoxStream<'static, FsResult<(String, EntryHandle)>> {
        stream::unfold(Some(self), |state| async move {
            let mut iter = state?;
            match iter.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(iter))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }
}

async fn next_child(
    fs: FileSystem,
    locator: FileSystemLocator,
    past_results: Arc<Mutex<HashSet<String>>>,
) -> FsResult<Option<(String, EntryHandle)>> {
    let mut dir = directory_entry(&fs, &locator, AccessStep::Query(AccessMode::Read)).await?;
    let children = dir.children().await?;

    let mut seen = past_results.lock();
    let Some(child) = children.iter().find(|c| !seen.contains(c.name())) else {
        return Ok(None);
    };
    seen.insert(child.name().to_string());

    let name = child.name().to_string();
    let handle = fs.handle_for(child.locator().clone());
    Ok(Some((name, handle)))
}
