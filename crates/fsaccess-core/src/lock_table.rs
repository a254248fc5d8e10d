//! Per-file-system storage for file entry locks.
//!
//! Entries are rebuilt on every resolution, so a lock cannot live inside the
//! entry value itself. The table keeps one [`FileLock`] slot per file
//! locator; a slot that returns to `open` is dropped.

use dashmap::DashMap;
use fsaccess_types::{release_lock, take_lock, FileLock, FileSystemLocator, LockKind, LockResult};

#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<FileSystemLocator, FileLock>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lock of `locator` (open if never taken).
    pub fn get(&self, locator: &FileSystemLocator) -> FileLock {
        self.locks.get(locator).map(|l| *l).unwrap_or_default()
    }

    /// Apply [`take_lock`] to the slot of `locator`.
    pub fn take(&self, kind: LockKind, locator: &FileSystemLocator) -> LockResult {
        let (result, open) = {
            let mut slot = self.locks.entry(locator.clone()).or_default();
            let result = take_lock(kind, slot.value_mut());
            (result, slot.is_open())
        };
        if open {
            self.locks.remove_if(locator, |_, l| l.is_open());
        }
        tracing::debug!(%locator, %kind, ?result, "take lock");
        result
    }

    /// Apply [`release_lock`] to the slot of `locator`.
    pub fn release(&self, locator: &FileSystemLocator) {
        let open = match self.locks.get_mut(locator) {
            Some(mut slot) => {
                release_lock(slot.value_mut());
                slot.is_open()
            }
            None => return,
        };
        if open {
            self.locks.remove_if(locator, |_, l| l.is_open());
        }
        tracing::debug!(%locator, "release lock");
    }

    /// Number of locators currently holding a lock.
    pub fn held(&self) -> usize {
        self.locks.len()
    }
}
