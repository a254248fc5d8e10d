//! Shared vocabulary for fsaccess.
//!
//! Pure leaf crate: locators and the path algorithms over them, the file
//! entry lock state machine, and the access-control result types. No async,
//! no I/O. `fsaccess-core` builds entries, handles and storage on top.
//!
//! # Key Types
//!
//! |-------------------------|------------------------------------------|
//! | Type                    | Purpose                                  |
//! |-------------------------|------------------------------------------|
//! | [`FileSystemLocator`]   | Kind + root + path; identifies a position |
//! | [`HandleKind`]          | File or directory                        |
//! | [`FileLock`]            | Lock state + shared holder count         |
//! | [`AccessResult`]        | Permission state + error name            |
//! |-------------------------|------------------------------------------|

pub mod access;
pub mod locator;
pub mod lock;

pub use access::{AccessMode, AccessResult, PermissionState, NOT_ALLOWED_ERROR};
pub use locator::{
    is_same_locator, is_same_path, is_valid_file_name, resolve, FileSystemLocator, HandleKind,
};
pub use lock::{release_lock, take_lock, FileLock, LockKind, LockResult, LockState};
