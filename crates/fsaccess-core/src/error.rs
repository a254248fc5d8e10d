//! Handle operation error types.

use fsaccess_types::FileSystemLocator;
use thiserror::Error;

use crate::vfs::VfsError;

/// Failure of a handle, stream or sync-access operation.
///
/// Every public operation either succeeds or fails with exactly one of
/// these kinds; nothing is retried internally.
#[derive(Debug, Error)]
pub enum FsError {
    /// Access control did not grant access. Carries the provider's error
    /// name verbatim.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The locator, or a named child, does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A child exists under that name but is of the other kind.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Non-recursive removal of a non-empty directory.
    #[error("invalid modification: {0}")]
    InvalidModification(String),

    /// The entry's lock is held incompatibly.
    #[error("lock conflict: {0}")]
    LockConflict(String),

    /// Not a valid file name (empty, `.`, `..`, or contains a separator).
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    /// The file changed since the snapshot was taken.
    #[error("file not readable: {0}")]
    NotReadable(String),

    /// Operation on a closed stream or handle, or outside a bucket file
    /// system where one is required.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed argument (e.g. an offset that does not fit in memory).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A buffer could not grow to the requested size.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The storage backend failed; passed through unmodified.
    #[error(transparent)]
    Storage(#[from] VfsError),

    /// The file system queue worker has shut down.
    #[error("file system queue closed")]
    QueueClosed,
}

impl FsError {
    pub fn access_denied(error_name: impl Into<String>) -> Self {
        Self::AccessDenied(error_name.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn type_mismatch(what: impl Into<String>) -> Self {
        Self::TypeMismatch(what.into())
    }

    pub fn invalid_modification(what: impl Into<String>) -> Self {
        Self::InvalidModification(what.into())
    }

    pub fn lock_conflict(locator: &FileSystemLocator) -> Self {
        Self::LockConflict(locator.to_string())
    }

    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }

    pub fn not_readable(what: impl Into<String>) -> Self {
        Self::NotReadable(what.into())
    }

    pub fn invalid_state(what: impl Into<String>) -> Self {
        Self::InvalidState(what.into())
    }

    pub fn invalid_argument(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }

    pub fn quota_exceeded(what: impl Into<String>) -> Self {
        Self::QuotaExceeded(what.into())
    }

    /// Web platform exception name for this kind of failure.
    ///
    /// Access denials report the provider's error name.
    pub fn name(&self) -> &str {
        match self {
            FsError::AccessDenied(name) => name,
            FsError::NotFound(_) => "NotFoundError",
            FsError::TypeMismatch(_) => "TypeMismatchError",
            FsError::InvalidModification(_) => "InvalidModificationError",
            FsError::LockConflict(_) => "NoModificationAllowedError",
            FsError::InvalidName(_) | FsError::InvalidArgument(_) => "TypeError",
            FsError::NotReadable(_) => "NotReadableError",
            FsError::InvalidState(_) => "InvalidStateError",
            FsError::QuotaExceeded(_) => "QuotaExceededError",
            FsError::Storage(_) => "OperationError",
            FsError::QueueClosed => "AbortError",
        }
    }
}

/// Result type of handle operations.
pub type FsResult<T> = Result<T, FsError>;

/// Resize `data` to `new_len`, zero-filling growth.
///
/// Growth is reserved up front so an oversized length fails with
/// [`FsError::QuotaExceeded`] instead of aborting the task.
pub(crate) fn resize_zeroed(data: &mut Vec<u8>, new_len: u64) -> FsResult<()> {
    let new_len = usize::try_from(new_len)
        .map_err(|_| FsError::quota_exceeded(format!("{new_len} bytes")))?;
    if let Some(extra) = new_len.checked_sub(data.len()).filter(|n| *n > 0) {
        data.try_reserve_exact(extra)
            .map_err(|e| FsError::quota_exceeded(format!("{new_len} bytes: {e}")))?;
    }
    data.resize(new_len, 0);
    Ok(())
}
