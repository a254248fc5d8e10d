//! Local filesystem backend.
//!
//! Provides access to real filesystem paths, with path security
//! to prevent escaping the root directory.

use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DirEntry, FileAttr, FileType};

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/srv/sandbox`, then the locator segments `notes/today.md` map to
/// `/srv/sandbox/notes/today.md`.
///
/// Path security is enforced: attempts to escape via `..` or symlinks
/// pointing outside the root are blocked.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    read_only: bool,
}

impl LocalBackend {
    /// Create a new local filesystem rooted at the given path.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self {
            root,
            read_only: false,
        }
    }

    /// Create a read-only local filesystem.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        let mut backend = Self::new(root);
        backend.read_only = true;
        backend
    }

    /// Set whether this filesystem is read-only.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// Returns an error if the path escapes the root.
    async fn resolve(&self, path: &Path) -> VfsResult<PathBuf> {
        let path = path.strip_prefix("/").unwrap_or(path);
        if path.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }

        let full = self.root.join(path);

        // Canonicalize to resolve symlinks and `..`. For paths that do not
        // exist yet, canonicalize the parent and re-append the file name.
        let canonical = if fs::try_exists(&full).await.unwrap_or(false) {
            dunce::canonicalize(&full)?
        } else {
            let parent = full.parent().ok_or_else(|| VfsError::invalid_path("no parent"))?;
            let filename = full
                .file_name()
                .ok_or_else(|| VfsError::invalid_path(path.display().to_string()))?;

            if fs::try_exists(parent).await.unwrap_or(false) {
                dunce::canonicalize(parent)?.join(filename)
            } else {
                // Parent doesn't exist; the operation itself will fail
                full
            }
        };

        if !canonical.starts_with(&self.root) {
            return Err(VfsError::path_escapes_root(format!(
                "{} is not under {}",
                canonical.display(),
                self.root.display()
            )));
        }

        Ok(canonical)
    }

    /// Check if write operations are allowed.
    fn check_writable(&self) -> VfsResult<()> {
        if self.read_only {
            Err(VfsError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn file_type(ft: &std::fs::FileType) -> FileType {
        if ft.is_dir() {
            FileType::Directory
        } else if ft.is_file() {
            FileType::File
        } else {
            FileType::Other
        }
    }

    fn metadata_to_attr(meta: &std::fs::Metadata) -> FileAttr {
        let kind = Self::file_type(&meta.file_type());
        FileAttr {
            size: if kind.is_dir() { 0 } else { meta.len() },
            kind,
            perm: meta.permissions().mode(),
            mtime: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        }
    }
}

#[async_trait]
impl VfsOps for LocalBackend {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let full_path = self.resolve(path).await?;
        let meta = fs::symlink_metadata(&full_path).await?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let full_path = self.resolve(path).await?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: Self::file_type(&file_type),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, path: &Path, offset: u64, size: u64) -> VfsResult<Vec<u8>> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        let full_path = self.resolve(path).await?;
        let mut file = fs::File::open(&full_path).await?;
        file.seek(std::io::SeekFrom::Start(offset)).await?;

        let mut buffer = Vec::new();
        file.take(size).read_to_end(&mut buffer).await?;
        Ok(buffer)
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u64> {
        use tokio::io::{AsyncSeekExt, AsyncWriteExt};

        self.check_writable()?;
        let full_path = self.resolve(path).await?;

        let mut file = fs::OpenOptions::new().write(true).open(&full_path).await?;
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(data.len() as u64)
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(&full_path)
            .await?;

        let meta = file.metadata().await?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;

        fs::DirBuilder::new()
            .mode(mode)
            .recursive(true)
            .create(&full_path)
            .await?;

        let meta = fs::metadata(&full_path).await?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        Ok(fs::remove_file(&full_path).await?)
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        if full_path == self.root {
            return Err(VfsError::permission_denied("cannot remove root"));
        }
        Ok(fs::remove_dir(&full_path).await?)
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        let file = fs::OpenOptions::new().write(true).open(&full_path).await?;
        Ok(file.set_len(size).await?)
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    async fn write_all(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        Ok(fs::write(&full_path, data).await?)
    }

    async fn remove_all(&self, path: &Path) -> VfsResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        if full_path == self.root {
            return Err(VfsError::permission_denied("cannot remove root"));
        }

        let meta = fs::symlink_metadata(&full_path).await?;
        if meta.is_dir() {
            fs::remove_dir_all(&full_path).await?;
        } else {
            fs::remove_file(&full_path).await?;
        }
        Ok(())
    }
}
