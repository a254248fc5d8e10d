//! Access-control providers.
//!
//! Entries consult an [`AccessControl`] before every algorithm that reads or
//! mutates them. [`GrantAll`] allows everything; [`PolicyAccess`] evaluates
//! configured rules and remembers grants handed out by requests.

use async_trait::async_trait;
use fsaccess_types::{AccessMode, AccessResult, FileSystemLocator, PermissionState, NOT_ALLOWED_ERROR};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Provider answering query-access and request-access steps.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Current access for `locator`, without side effects.
    async fn query_access(&self, locator: &FileSystemLocator, mode: AccessMode) -> AccessResult;

    /// Ask for access to `locator`; may change future answers.
    async fn request_access(&self, locator: &FileSystemLocator, mode: AccessMode) -> AccessResult;
}

/// Grants every query and request.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantAll;

#[async_trait]
impl AccessControl for GrantAll {
    async fn query_access(&self, _locator: &FileSystemLocator, _mode: AccessMode) -> AccessResult {
        AccessResult::granted()
    }

    async fn request_access(&self, _locator: &FileSystemLocator, _mode: AccessMode) -> AccessResult {
        AccessResult::granted()
    }
}

/// One permission rule: state for `mode` on a root, optionally below a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub root: String,
    /// Path prefix the rule applies under; empty means the whole root.
    #[serde(default)]
    pub path: Vec<String>,
    pub mode: AccessMode,
    pub state: PermissionState,
}

impl PermissionRule {
    fn applies(&self, locator: &FileSystemLocator, mode: AccessMode) -> bool {
        if self.root != locator.root() || !locator.path().starts_with(&self.path) {
            return false;
        }
        // A granted readwrite rule answers read queries too.
        self.mode == mode || (self.mode.covers(mode) && self.state == PermissionState::Granted)
    }
}

/// Configuration of a [`PolicyAccess`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// State when no rule applies.
    #[serde(default = "default_state")]
    pub default: PermissionState,
    /// Answer given to a request whose state is `prompt`.
    #[serde(default = "default_prompt_response")]
    pub prompt_response: PermissionState,
    #[serde(default)]
    pub rules: Vec<PermissionRule>,
}

fn default_state() -> PermissionState {
    PermissionState::Granted
}

fn default_prompt_response() -> PermissionState {
    PermissionState::Denied
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            default: default_state(),
            prompt_response: default_prompt_response(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Grant {
    root: String,
    path: Vec<String>,
    mode: AccessMode,
}

impl Grant {
    /// Whether this grant answers `mode` for `root`/`path`.
    fn covers(&self, root: &str, path: &[String], mode: AccessMode) -> bool {
        self.root == root && path.starts_with(&self.path) && self.mode.covers(mode)
    }
}

/// Rule-based provider.
///
/// The most specific applicable rule (longest path prefix, later rules
/// winning ties) decides. A request that ends up granted is remembered for
/// the locator and everything below it.
#[derive(Debug)]
pub struct PolicyAccess {
    config: PermissionsConfig,
    grants: Mutex<Vec<Grant>>,
}

impl PolicyAccess {
    pub fn new(config: PermissionsConfig) -> Self {
        Self {
            config,
            grants: Mutex::new(Vec::new()),
        }
    }

    fn state_for(&self, locator: &FileSystemLocator, mode: AccessMode) -> PermissionState {
        let remembered = self
            .grants
            .lock()
            .iter()
            .any(|g| g.covers(locator.root(), locator.path(), mode));
        if remembered {
            return PermissionState::Granted;
        }

        self.config
            .rules
            .iter()
            .filter(|r| r.applies(locator, mode))
            .fold(None::<&PermissionRule>, |best, r| match best {
                Some(b) if b.path.len() > r.path.len() => Some(b),
                _ => Some(r),
            })
            .map(|r| r.state)
            .unwrap_or(self.config.default)
    }

    fn result(state: PermissionState) -> AccessResult {
        match state {
            PermissionState::Granted => AccessResult::granted(),
            other => AccessResult::new(other, NOT_ALLOWED_ERROR),
        }
    }
}

#[async_trait]
impl AccessControl for PolicyAccess {
    async fn query_access(&self, locator: &FileSystemLocator, mode: AccessMode) -> AccessResult {
        Self::result(self.state_for(locator, mode))
    }

    async fn request_access(&self, locator: &FileSystemLocator, mode: AccessMode) -> AccessResult {
        let state = match self.state_for(locator, mode) {
            PermissionState::Prompt => self.config.prompt_response,
            other => other,
        };
        if state == PermissionState::Granted {
            remember(&mut self.grants.lock(), locator, mode);
        }
        tracing::debug!(%locator, %mode, %state, "access requested");
        Self::result(state)
    }
}

/// Record a grant unless an existing one already covers it; grants the new
/// one covers are dropped.
fn remember(grants: &mut Vec<Grant>, locator: &FileSystemLocator, mode: AccessMode) {
    let (root, path) = (locator.root(), locator.path());
    if grants.iter().any(|g| g.covers(root, path, mode)) {
        return;
    }
    grants.retain(|g| !(g.root == root && g.path.starts_with(path) && mode.covers(g.mode)));
    grants.push(Grant {
        root: root.to_string(),
        path: path.to_vec(),
        mode,
    });
}
