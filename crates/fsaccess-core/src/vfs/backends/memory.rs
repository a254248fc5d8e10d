//! In-memory storage backend.
//!
//! Used for bucket roots and testing. All data is ephemeral.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DirEntry, FileAttr, FileType};

/// Node in the memory filesystem.
#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, attr: FileAttr },
    Directory { attr: FileAttr },
}

impl Node {
    fn attr(&self) -> &FileAttr {
        match self {
            Node::File { attr, .. } => attr,
            Node::Directory { attr } => attr,
        }
    }

    fn kind(&self) -> FileType {
        match self {
            Node::File { .. } => FileType::File,
            Node::Directory { .. } => FileType::Directory,
        }
    }
}

/// Advance `attr.mtime` to now, strictly past its previous value.
///
/// Snapshot staleness checks compare timestamps, so two writes in the same
/// clock tick must still be distinguishable.
fn touch(attr: &mut FileAttr) {
    let now = SystemTime::now();
    attr.mtime = if now > attr.mtime {
        now
    } else {
        attr.mtime + Duration::from_nanos(1)
    };
}

/// In-memory storage backend.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
#[derive(Debug)]
pub struct MemoryBackend {
    nodes: RwLock<HashMap<PathBuf, Node>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        // Root directory always exists
        nodes.insert(
            PathBuf::new(),
            Node::Directory {
                attr: FileAttr::directory(0o755),
            },
        );
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Normalize a path: remove leading `/`, resolve `.` and `..`.
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(s) => result.push(s),
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        result
    }

    fn path_str(path: &Path) -> String {
        path.display().to_string()
    }

    fn read_nodes(
        &self,
    ) -> VfsResult<std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Node>>> {
        self.nodes
            .read()
            .map_err(|_| VfsError::other("lock poisoned"))
    }

    fn write_nodes(
        &self,
    ) -> VfsResult<std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, Node>>> {
        self.nodes
            .write()
            .map_err(|_| VfsError::other("lock poisoned"))
    }

    /// Ensure all parent directories of `path` exist.
    fn ensure_parents(nodes: &mut HashMap<PathBuf, Node>, path: &Path) -> VfsResult<()> {
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            if let Component::Normal(s) = component {
                current.push(s);
                let node = nodes.entry(current.clone()).or_insert(Node::Directory {
                    attr: FileAttr::directory(0o755),
                });
                if !matches!(node, Node::Directory { .. }) {
                    return Err(VfsError::not_a_directory(Self::path_str(&current)));
                }
            }
        }
        Ok(())
    }

    fn has_children(nodes: &HashMap<PathBuf, Node>, path: &Path) -> bool {
        nodes
            .keys()
            .any(|k| k.parent() == Some(path) && k.as_path() != path)
    }
}

#[async_trait]
impl VfsOps for MemoryBackend {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let normalized = Self::normalize(path);
        let nodes = self.read_nodes()?;
        nodes
            .get(&normalized)
            .map(|n| n.attr().clone())
            .ok_or_else(|| VfsError::not_found(Self::path_str(&normalized)))
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let normalized = Self::normalize(path);
        let nodes = self.read_nodes()?;

        match nodes.get(&normalized) {
            Some(Node::Directory { .. }) => {}
            Some(_) => return Err(VfsError::not_a_directory(Self::path_str(&normalized))),
            None => return Err(VfsError::not_found(Self::path_str(&normalized))),
        }

        let mut result: Vec<DirEntry> = nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(normalized.as_path()) && **p != normalized)
            .filter_map(|(p, node)| {
                p.file_name()
                    .map(|name| DirEntry::new(name.to_string_lossy(), node.kind()))
            })
            .collect();

        // HashMap order is arbitrary; sort for a stable listing
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn read(&self, path: &Path, offset: u64, size: u64) -> VfsResult<Vec<u8>> {
        let normalized = Self::normalize(path);
        let nodes = self.read_nodes()?;

        match nodes.get(&normalized) {
            Some(Node::File { data, .. }) => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
                let len = usize::try_from(size).unwrap_or(usize::MAX);
                let end = start.saturating_add(len).min(data.len());
                Ok(data[start..end].to_vec())
            }
            Some(Node::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&normalized)))
            }
            None => Err(VfsError::not_found(Self::path_str(&normalized))),
        }
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u64> {
        let normalized = Self::normalize(path);
        let mut nodes = self.write_nodes()?;

        match nodes.get_mut(&normalized) {
            Some(Node::File {
                data: file_data,
                attr,
            }) => {
                let offset = usize::try_from(offset)
                    .map_err(|_| VfsError::invalid_path("offset out of range"))?;
                let end = offset + data.len();
                if end > file_data.len() {
                    file_data.resize(end, 0);
                }
                file_data[offset..end].copy_from_slice(data);
                attr.size = file_data.len() as u64;
                touch(attr);
                Ok(data.len() as u64)
            }
            Some(Node::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&normalized)))
            }
            None => Err(VfsError::not_found(Self::path_str(&normalized))),
        }
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        let normalized = Self::normalize(path);
        if normalized.as_os_str().is_empty() {
            return Err(VfsError::already_exists("/"));
        }

        let mut nodes = self.write_nodes()?;
        Self::ensure_parents(&mut nodes, &normalized)?;

        if nodes.contains_key(&normalized) {
            return Err(VfsError::already_exists(Self::path_str(&normalized)));
        }

        let attr = FileAttr::file(0, mode);
        nodes.insert(
            normalized,
            Node::File {
                data: Vec::new(),
                attr: attr.clone(),
            },
        );
        Ok(attr)
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        let normalized = Self::normalize(path);
        let mut nodes = self.write_nodes()?;
        Self::ensure_parents(&mut nodes, &normalized)?;

        if let Some(existing) = nodes.get(&normalized) {
            return match existing {
                Node::Directory { attr } => Ok(attr.clone()),
                Node::File { .. } => Err(VfsError::already_exists(Self::path_str(&normalized))),
            };
        }

        let attr = FileAttr::directory(mode);
        nodes.insert(normalized, Node::Directory { attr: attr.clone() });
        Ok(attr)
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        let normalized = Self::normalize(path);
        let mut nodes = self.write_nodes()?;

        match nodes.get(&normalized) {
            Some(Node::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&normalized)))
            }
            Some(Node::File { .. }) => {
                nodes.remove(&normalized);
                Ok(())
            }
            None => Err(VfsError::not_found(Self::path_str(&normalized))),
        }
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        let normalized = Self::normalize(path);
        if normalized.as_os_str().is_empty() {
            return Err(VfsError::permission_denied("cannot remove root"));
        }

        let mut nodes = self.write_nodes()?;
        match nodes.get(&normalized) {
            Some(Node::Directory { .. }) => {}
            Some(_) => return Err(VfsError::not_a_directory(Self::path_str(&normalized))),
            None => return Err(VfsError::not_found(Self::path_str(&normalized))),
        }

        if Self::has_children(&nodes, &normalized) {
            return Err(VfsError::directory_not_empty(Self::path_str(&normalized)));
        }

        nodes.remove(&normalized);
        Ok(())
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        let normalized = Self::normalize(path);
        let mut nodes = self.write_nodes()?;

        match nodes.get_mut(&normalized) {
            Some(Node::File { data, attr }) => {
                let size_usize = usize::try_from(size)
                    .map_err(|_| VfsError::invalid_path("size out of range"))?;
                data.resize(size_usize, 0);
                attr.size = size;
                touch(attr);
                Ok(())
            }
            Some(Node::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&normalized)))
            }
            None => Err(VfsError::not_found(Self::path_str(&normalized))),
        }
    }

    fn read_only(&self) -> bool {
        false
    }

    async fn write_all(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        let normalized = Self::normalize(path);
        let mut nodes = self.write_nodes()?;
        Self::ensure_parents(&mut nodes, &normalized)?;

        match nodes.get_mut(&normalized) {
            Some(Node::File {
                data: file_data,
                attr,
            }) => {
                file_data.clear();
                file_data.extend_from_slice(data);
                attr.size = data.len() as u64;
                touch(attr);
                Ok(())
            }
            Some(Node::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&normalized)))
            }
            None => {
                let attr = FileAttr::file(data.len() as u64, 0o644);
                nodes.insert(
                    normalized,
                    Node::File {
                        data: data.to_vec(),
                        attr,
                    },
                );
                Ok(())
            }
        }
    }

    async fn remove_all(&self, path: &Path) -> VfsResult<()> {
        let normalized = Self::normalize(path);
        if normalized.as_os_str().is_empty() {
            return Err(VfsError::permission_denied("cannot remove root"));
        }

        let mut nodes = self.write_nodes()?;
        if !nodes.contains_key(&normalized) {
            return Err(VfsError::not_found(Self::path_str(&normalized)));
        }
        nodes.retain(|p, _| !p.starts_with(&normalized));
        Ok(())
    }
}
