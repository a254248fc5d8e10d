//! File system locators and the path algorithms over them.
//!
//! A [`FileSystemLocator`] names a *position* (kind + root + path segments),
//! not a live object. Nothing here touches storage: these are the pure
//! comparisons the handle layer builds on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::EnumString;

/// Kind of entry a locator (and the handle wrapping it) refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HandleKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl HandleKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleKind::File => "file",
            HandleKind::Directory => "directory",
        }
    }

    /// Returns true if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, HandleKind::File)
    }

    /// Returns true if this is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, HandleKind::Directory)
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value-typed address of a file system entry.
///
/// Two locators denote the same entry iff kind, root and every path segment
/// are equal, which is exactly the derived `PartialEq`. Locators are
/// immutable; [`FileSystemLocator::child`] is the only derivation.
///
/// A first path segment equal to `""` marks a locator inside a bucket
/// (sandboxed) file system.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileSystemLocator {
    kind: HandleKind,
    root: String,
    path: Vec<String>,
}

impl FileSystemLocator {
    /// Create a locator.
    pub fn new(kind: HandleKind, root: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            kind,
            root: root.into(),
            path,
        }
    }

    /// Create a file locator.
    pub fn file<S: Into<String>>(root: impl Into<String>, path: impl IntoIterator<Item = S>) -> Self {
        Self::new(HandleKind::File, root, path.into_iter().map(Into::into).collect())
    }

    /// Create a directory locator.
    pub fn directory<S: Into<String>>(
        root: impl Into<String>,
        path: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(HandleKind::Directory, root, path.into_iter().map(Into::into).collect())
    }

    /// Locator of the root directory of a bucket file system.
    pub fn bucket_root(root: impl Into<String>) -> Self {
        Self::new(HandleKind::Directory, root, vec![String::new()])
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The last path segment, or `""` for an empty path.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    /// Derive a child locator: same root, parent path with `name` appended.
    ///
    /// The name is not validated here; callers check it with
    /// [`is_valid_file_name`] before deriving.
    pub fn child(&self, kind: HandleKind, name: impl Into<String>) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend(self.path.iter().cloned());
        path.push(name.into());
        Self {
            kind,
            root: self.root.clone(),
            path,
        }
    }

    /// Returns true if this locator lives in a bucket file system.
    pub fn is_in_bucket_file_system(&self) -> bool {
        self.path.first().is_some_and(|s| s.is_empty())
    }

    /// Path segments with the bucket sentinel stripped.
    pub fn storage_segments(&self) -> &[String] {
        if self.is_in_bucket_file_system() {
            &self.path[1..]
        } else {
            &self.path
        }
    }
}

impl fmt::Display for FileSystemLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.kind, self.root, self.storage_segments().join("/"))
    }
}

/// Returns true if `a` and `b` have the same length and equal segments.
///
/// No normalization happens: `.` and `..` are compared literally.
pub fn is_same_path<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.as_ref() == y.as_ref())
}

/// Returns true if both locators denote the same entry.
pub fn is_same_locator(a: &FileSystemLocator, b: &FileSystemLocator) -> bool {
    a.kind == b.kind && a.root == b.root && is_same_path(&a.path, &b.path)
}

/// Returns true if `name` may be used as a single child name.
///
/// Rejects the empty string, `.`, `..` and anything containing `/`. The
/// answer is the same on every platform.
pub fn is_valid_file_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name == "." || name == ".." {
        return false;
    }
    !name.contains('/')
}

/// Relative path from `root` to `child`, or `None` if `root` is not an
/// ancestor (or the same entry) of `child`.
pub fn resolve(child: &FileSystemLocator, root: &FileSystemLocator) -> Option<Vec<String>> {
    if child.root != root.root {
        return None;
    }

    let child_path = &child.path;
    let root_path = &root.path;

    if is_same_path(child_path, root_path) {
        return Some(Vec::new());
    }

    if root_path.len() > child_path.len() {
        return None;
    }

    if root_path.iter().zip(child_path).any(|(r, c)| r != c) {
        return None;
    }

    Some(child_path[root_path.len()..].to_vec())
}
