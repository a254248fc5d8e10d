//! Entry collaborators implemented over mounted backends.

use async_trait::async_trait;
use fsaccess_types::{is_valid_file_name, FileSystemLocator, HandleKind};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use super::error::{VfsError, VfsResult};
use super::ops::VfsOps;
use super::roots::RootTable;
use crate::entry::FileSystemEntry;
use crate::io::{EntryIo, UnderlyingFileSystem};

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

/// [`EntryIo`] and [`UnderlyingFileSystem`] over a [`RootTable`].
///
/// A locator's root selects the backend; its storage segments become the
/// backend-relative path.
#[derive(Debug, Default)]
pub struct VfsStorage {
    roots: RootTable,
}

impl VfsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`RootTable::mount`].
    pub fn with_root(self, id: impl Into<String>, fs: impl VfsOps + 'static) -> Self {
        self.roots.mount(id, fs);
        self
    }

    pub fn roots(&self) -> &RootTable {
        &self.roots
    }

    /// Backend and backend-relative path for `locator`.
    fn route(&self, locator: &FileSystemLocator) -> VfsResult<(Arc<dyn VfsOps>, PathBuf)> {
        let fs = self.roots.backend(locator.root())?;
        let path = relative_path(locator.storage_segments())?;
        Ok((fs, path))
    }

    /// Backend and path of the child `name` under `parent`.
    fn route_child(
        &self,
        parent: &FileSystemLocator,
        name: &str,
    ) -> VfsResult<(Arc<dyn VfsOps>, PathBuf)> {
        if !is_host_segment(name) {
            return Err(VfsError::invalid_path(name));
        }
        let (fs, path) = self.route(parent)?;
        Ok((fs, path.join(name)))
    }
}

/// Join locator segments into a backend path.
///
/// Locators built from caller input can carry `..` or separators; those
/// never reach a backend.
fn relative_path(segments: &[String]) -> VfsResult<PathBuf> {
    let mut path = PathBuf::new();
    for segment in segments {
        if !is_host_segment(segment) {
            return Err(VfsError::invalid_path(segments.join("/")));
        }
        path.push(segment);
    }
    Ok(path)
}

/// A valid file name that is also a single component on this host.
fn is_host_segment(name: &str) -> bool {
    is_valid_file_name(name) && !name.chars().any(std::path::is_separator)
}

/// Errors that mean "nothing there" when locating.
fn is_missing(err: &VfsError) -> bool {
    match err {
        VfsError::NotADirectory(_) => true,
        VfsError::Io(e) => e.kind() == io::ErrorKind::NotADirectory,
        other => other.is_not_found(),
    }
}

#[async_trait]
impl EntryIo for VfsStorage {
    async fn locate(&self, locator: &FileSystemLocator) -> VfsResult<Option<HandleKind>> {
        let (fs, path) = self.route(locator)?;
        match fs.getattr(&path).await {
            Ok(attr) => Ok(attr.kind.handle_kind()),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn binary_data(&self, locator: &FileSystemLocator) -> VfsResult<Vec<u8>> {
        let (fs, path) = self.route(locator)?;
        fs.read_all(&path).await
    }

    async fn modification_timestamp(&self, locator: &FileSystemLocator) -> VfsResult<SystemTime> {
        let (fs, path) = self.route(locator)?;
        Ok(fs.getattr(&path).await?.mtime)
    }

    async fn children(&self, locator: &FileSystemLocator) -> VfsResult<Vec<FileSystemLocator>> {
        let (fs, path) = self.route(locator)?;
        let entries = fs.readdir(&path).await?;
        Ok(entries
            .into_iter()
            .filter_map(|e| Some(locator.child(e.kind.handle_kind()?, e.name)))
            .collect())
    }
}

#[async_trait]
impl UnderlyingFileSystem for VfsStorage {
    async fn create(&self, entry: &FileSystemEntry, parent: &FileSystemLocator) -> VfsResult<()> {
        let (fs, path) = self.route_child(parent, entry.name())?;
        match entry {
            FileSystemEntry::File(file) => {
                fs.create(&path, FILE_MODE).await?;
                if let Some(data) = file.cached_binary_data().filter(|d| !d.is_empty()) {
                    fs.write(&path, 0, data).await?;
                }
            }
            FileSystemEntry::Directory(_) => {
                fs.mkdir(&path, DIR_MODE).await?;
            }
        }
        Ok(())
    }

    async fn remove(&self, entry: &FileSystemEntry, parent: &FileSystemLocator) -> VfsResult<()> {
        let (fs, path) = self.route_child(parent, entry.name())?;
        match entry {
            FileSystemEntry::File(_) => fs.unlink(&path).await,
            FileSystemEntry::Directory(_) => fs.remove_all(&path).await,
        }
    }

    async fn write(&self, locator: &FileSystemLocator, data: &[u8]) -> VfsResult<()> {
        let (fs, path) = self.route(locator)?;
        fs.write_all(&path, data).await
    }
}
