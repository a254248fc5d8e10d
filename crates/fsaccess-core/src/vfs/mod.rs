//! Path-based storage layer under the entry model.
//!
//! - [`VfsOps`] - Core trait for storage backend operations
//! - [`RootTable`] - Maps locator roots to backends
//! - [`VfsStorage`] - Implements the entry collaborators over a root table
//! - [`MemoryBackend`] - In-memory storage (bucket roots, testing)
//! - [`LocalBackend`] - Local directory access (with path security)
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Backends see paths relative to their own
//!   root. Locator segments are joined into that path after the bucket
//!   sentinel is stripped.
//! - **One backend per root**: a locator's root picks the backend exactly;
//!   there is no prefix routing between roots.

pub mod backends;
mod error;
mod ops;
mod roots;
mod storage;
mod types;

pub use backends::{LocalBackend, MemoryBackend};
pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use roots::{RootInfo, RootTable};
pub use storage::VfsStorage;
pub use types::{DirEntry, FileAttr, FileType};
