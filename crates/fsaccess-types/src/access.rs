//! Access modes and permission results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::EnumString;

/// Error name used for access that was not granted.
pub const NOT_ALLOWED_ERROR: &str = "NotAllowedError";

/// Access mode requested from an access-control provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AccessMode {
    #[default]
    Read,
    Readwrite,
}

impl AccessMode {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::Readwrite => "readwrite",
        }
    }

    /// Returns true if access granted for `self` also covers `other`.
    pub fn covers(&self, other: AccessMode) -> bool {
        matches!((self, other), (AccessMode::Readwrite, _) | (AccessMode::Read, AccessMode::Read))
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Permission state, as in the Permissions API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PermissionState {
    Granted,
    Denied,
    #[default]
    Prompt,
}

impl PermissionState {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
            PermissionState::Prompt => "prompt",
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a query-access or request-access step.
///
/// `error_name` is surfaced verbatim when the state is not granted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResult {
    pub permission_state: PermissionState,
    pub error_name: String,
}

impl AccessResult {
    pub fn new(permission_state: PermissionState, error_name: impl Into<String>) -> Self {
        Self {
            permission_state,
            error_name: error_name.into(),
        }
    }

    /// Access granted.
    pub fn granted() -> Self {
        Self::new(PermissionState::Granted, "")
    }

    /// Access denied with the default error name.
    pub fn denied() -> Self {
        Self::new(PermissionState::Denied, NOT_ALLOWED_ERROR)
    }

    /// Access requires a prompt.
    pub fn prompt() -> Self {
        Self::new(PermissionState::Prompt, NOT_ALLOWED_ERROR)
    }

    pub fn is_granted(&self) -> bool {
        self.permission_state == PermissionState::Granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_covers() {
        assert!(AccessMode::Readwrite.covers(AccessMode::Read));
        assert!(AccessMode::Readwrite.covers(AccessMode::Readwrite));
        assert!(AccessMode::Read.covers(AccessMode::Read));
        assert!(!AccessMode::Read.covers(AccessMode::Readwrite));
    }

    #[test]
    fn test_parse() {
        assert_eq!(AccessMode::from_str("ReadWrite"), Some(AccessMode::Readwrite));
        assert_eq!(PermissionState::from_str("denied"), Some(PermissionState::Denied));
        assert_eq!(PermissionState::from_str("maybe"), None);
    }

    #[test]
    fn test_results() {
        assert!(AccessResult::granted().is_granted());
        let denied = AccessResult::denied();
        assert!(!denied.is_granted());
        assert_eq!(denied.error_name, NOT_ALLOWED_ERROR);
        assert_eq!(AccessResult::prompt().permission_state, PermissionState::Prompt);
    }
}
