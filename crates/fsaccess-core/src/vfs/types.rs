//! Storage metadata types.

use fsaccess_types::HandleKind;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Node type as reported by a backend.
///
/// Backends may see things the handle layer cannot address (symlinks,
/// sockets); those surface as [`FileType::Other`] and are skipped when
/// listing children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    File,
    Directory,
    Other,
}

impl FileType {
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Handle kind this node can be addressed as, if any.
    pub fn handle_kind(&self) -> Option<HandleKind> {
        match self {
            FileType::File => Some(HandleKind::File),
            FileType::Directory => Some(HandleKind::Directory),
            FileType::Other => None,
        }
    }
}

impl From<HandleKind> for FileType {
    fn from(kind: HandleKind) -> Self {
        match kind {
            HandleKind::File => FileType::File,
            HandleKind::Directory => FileType::Directory,
        }
    }
}

/// Node attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes (0 for directories).
    pub size: u64,
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
}

impl FileAttr {
    /// Attributes for a new file.
    pub fn file(size: u64, perm: u32) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm,
            mtime: SystemTime::now(),
        }
    }

    /// Attributes for a new directory.
    pub fn directory(perm: u32) -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            perm,
            mtime: SystemTime::now(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    pub kind: FileType,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }
}
