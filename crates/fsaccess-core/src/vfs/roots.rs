//! Root table: which backend serves which locator root.

use dashmap::DashMap;
use std::sync::Arc;

use super::error::{VfsError, VfsResult};
use super::ops::VfsOps;

/// Information about a mounted root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootInfo {
    /// Root identifier, as carried by locators.
    pub id: String,
    /// Whether the backend refuses writes.
    pub read_only: bool,
}

/// Routes locator roots to mounted backends.
#[derive(Default)]
pub struct RootTable {
    roots: DashMap<String, Arc<dyn VfsOps>>,
}

impl std::fmt::Debug for RootTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootTable")
            .field("roots", &self.list_roots())
            .finish()
    }
}

impl RootTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a backend under `id`, replacing any previous one.
    pub fn mount(&self, id: impl Into<String>, fs: impl VfsOps + 'static) {
        self.mount_arc(id, Arc::new(fs));
    }

    /// Mount a backend (already wrapped in Arc) under `id`.
    pub fn mount_arc(&self, id: impl Into<String>, fs: Arc<dyn VfsOps>) {
        let id = id.into();
        tracing::debug!(root = %id, read_only = fs.read_only(), "mount root");
        self.roots.insert(id, fs);
    }

    /// Unmount the backend under `id`.
    ///
    /// Returns `true` if a root was removed.
    pub fn unmount(&self, id: &str) -> bool {
        self.roots.remove(id).is_some()
    }

    /// List all mounted roots, sorted by id.
    pub fn list_roots(&self) -> Vec<RootInfo> {
        let mut roots: Vec<RootInfo> = self
            .roots
            .iter()
            .map(|r| RootInfo {
                id: r.key().clone(),
                read_only: r.value().read_only(),
            })
            .collect();
        roots.sort_by(|a, b| a.id.cmp(&b.id));
        roots
    }

    /// Backend serving `id`.
    pub fn backend(&self, id: &str) -> VfsResult<Arc<dyn VfsOps>> {
        self.roots
            .get(id)
            .map(|fs| Arc::clone(fs.value()))
            .ok_or_else(|| VfsError::unknown_root(id))
    }
}
