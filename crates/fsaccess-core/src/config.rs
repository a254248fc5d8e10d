//! TOML configuration: roots, permissions and options.
//!
//! ```toml
//! sync_access_bucket_only = true
//!
//! [[roots]]
//! id = "scratch"
//! backend = "memory"
//! bucket = true
//!
//! [[roots]]
//! id = "project"
//! backend = "local"
//! path = "/home/user/project"
//!
//! [permissions]
//! default = "granted"
//! prompt_response = "denied"
//!
//! [[permissions.rules]]
//! root = "project"
//! mode = "readwrite"
//! state = "prompt"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use strum::EnumString;

use crate::access::{PermissionsConfig, PolicyAccess};
use crate::filesystem::{FileSystem, FileSystemBuilder, FileSystemOptions};
use crate::vfs::{LocalBackend, MemoryBackend, VfsStorage};

/// Error loading or applying a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Storage backend kind of a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Local,
}

/// One mounted root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfig {
    pub id: String,
    pub backend: BackendKind,
    /// Directory served by a local root.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub read_only: bool,
    /// Whether handles into this root live in a bucket file system.
    #[serde(default)]
    pub bucket: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemConfig {
    #[serde(default = "default_true")]
    pub sync_access_bucket_only: bool,
    #[serde(default)]
    pub roots: Vec<RootConfig>,
    #[serde(default)]
    pub permissions: PermissionsConfig,
}

fn default_true() -> bool {
    true
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            sync_access_bucket_only: true,
            roots: Vec::new(),
            permissions: PermissionsConfig::default(),
        }
    }
}

impl FileSystemConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// A config serving one local directory as root `id`.
    pub fn single_local(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![RootConfig {
                id: id.into(),
                backend: BackendKind::Local,
                path: Some(path.into()),
                read_only: false,
                bucket: false,
            }],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for root in &self.roots {
            if root.id.is_empty() {
                return Err(ConfigError::Invalid("root id must not be empty".into()));
            }
            if !seen.insert(root.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate root id {:?}", root.id)));
            }
            match (root.backend, &root.path) {
                (BackendKind::Local, None) => {
                    return Err(ConfigError::Invalid(format!(
                        "local root {:?} needs a path",
                        root.id
                    )));
                }
                (BackendKind::Local, Some(path)) if !path.is_dir() => {
                    return Err(ConfigError::Invalid(format!(
                        "local root {:?}: {} is not a directory",
                        root.id,
                        path.display()
                    )));
                }
                (BackendKind::Memory, _) if root.read_only => {
                    return Err(ConfigError::Invalid(format!(
                        "memory root {:?} cannot be read-only",
                        root.id
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Storage with every configured root mounted.
    pub fn storage(&self) -> Result<VfsStorage, ConfigError> {
        self.validate()?;
        let storage = VfsStorage::new();
        for root in &self.roots {
            match (root.backend, &root.path) {
                (BackendKind::Memory, _) => storage.roots().mount(&root.id, MemoryBackend::new()),
                (BackendKind::Local, Some(path)) => {
                    let mut backend = LocalBackend::new(path);
                    backend.set_read_only(root.read_only);
                    storage.roots().mount(&root.id, backend);
                }
                (BackendKind::Local, None) => {
                    return Err(ConfigError::Invalid(format!(
                        "local root {:?} needs a path",
                        root.id
                    )));
                }
            }
        }
        Ok(storage)
    }

    pub fn options(&self) -> FileSystemOptions {
        FileSystemOptions {
            sync_access_bucket_only: self.sync_access_bucket_only,
            bucket_roots: self
                .roots
                .iter()
                .filter(|r| r.bucket)
                .map(|r| r.id.clone())
                .collect(),
        }
    }

    /// Build a ready [`FileSystem`]. Must run inside a tokio runtime.
    pub fn build(&self) -> Result<FileSystem, ConfigError> {
        let storage = self.storage()?;
        let fs = FileSystem::builder(storage)
            .access(PolicyAccess::new(self.permissions.clone()))
            .options(self.options())
            .build();
        tracing::debug!(roots = self.roots.len(), "file system built from config");
        Ok(fs)
    }

    /// Builder with storage and access wired, for further customization.
    pub fn builder(&self) -> Result<FileSystemBuilder, ConfigError> {
        Ok(FileSystem::builder(self.storage()?)
            .access(PolicyAccess::new(self.permissions.clone()))
            .options(self.options()))
    }
}
