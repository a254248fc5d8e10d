//! # fsaccess-core
//!
//! Origin-scoped file system access over mounted storage roots.
//!
//! Callers hold *handles*: lightweight references to a position in a root
//! (a [`FileSystemLocator`]) plus the [`FileSystem`] they came from. Every
//! operation on a handle is queued on the file system's single FIFO worker,
//! so operations observe each other in submission order. Inside a queued
//! step, the handle resolves its locator to an *entry* through the
//! [`EntryIo`] collaborator, checks access with an [`AccessControl`]
//! provider, and mutates storage through [`UnderlyingFileSystem`].
//!
//! Writers take locks on file entries: writable streams share, sync access
//! handles are exclusive. Locks live in the file system's [`LockTable`] and
//! are released on close, abort or drop.
//!
//! ```text
//! FileSystemDirectoryHandle ──┐
//! FileSystemFileHandle ───────┼─► FileSystemQueue ─► entry ─► EntryIo / UnderlyingFileSystem
//!                             │        (FIFO)          │             │
//!                             │                        ▼             ▼
//!                             │                   LockTable     VfsStorage ─► RootTable ─► VfsOps
//!                             │                                                   (memory, local)
//! ```

pub mod access;
pub mod config;
pub mod entry;
pub mod error;
pub mod filesystem;
pub mod handle;
pub mod io;
pub mod lock_table;
pub mod queue;
pub mod snapshot;
pub mod sync_access;
pub mod vfs;
pub mod writable;

pub use access::{AccessControl, GrantAll, PermissionRule, PermissionsConfig, PolicyAccess};
pub use config::{BackendKind, ConfigError, FileSystemConfig, RootConfig};
pub use entry::{DirectoryEntry, EntryContext, FileEntry, FileSystemEntry, locate_entry};
pub use error::{FsError, FsResult};
pub use filesystem::{FileSystem, FileSystemBuilder, FileSystemOptions};
pub use handle::{
    CreateWritableOptions, DirectoryIterator, EntryHandle, FileSystemDirectoryHandle,
    FileSystemFileHandle, FileSystemHandle, GetDirectoryOptions, GetFileOptions, RemoveOptions,
};
pub use io::{EntryIo, UnderlyingFileSystem};
pub use lock_table::LockTable;
pub use queue::FileSystemQueue;
pub use snapshot::{DEFAULT_CHUNK_SIZE, File};
pub use sync_access::FileSystemSyncAccessHandle;
pub use vfs::{
    DirEntry, FileAttr, FileType, LocalBackend, MemoryBackend, RootInfo, RootTable, VfsError,
    VfsOps, VfsResult, VfsStorage,
};
pub use writable::{FileSystemWritableFileStream, WriteCommand};

pub use fsaccess_types::{
    AccessMode, AccessResult, FileLock, FileSystemLocator, HandleKind, LockKind, LockResult,
    LockState, PermissionState,
};
