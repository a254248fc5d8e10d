//! Integration tests for directory and file handles.
//!
//! # Tiers
//!
//! - **Tier 1:** directory algorithms over a memory root (get-or-create,
//!   removal, iteration, resolve)
//! - **Tier 2:** the same algorithms over a local root in a tempdir
//! - **Tier 3:** collaborator failures, using small doubles for access
//!   control and the underlying file system

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use fsaccess_core::{
    AccessControl, AccessMode, AccessResult, EntryIo, FileSystem, FileSystemBuilder,
    FileSystemDirectoryHandle, FileSystemEntry, FileSystemLocator, FsError, GetDirectoryOptions,
    GetFileOptions, HandleKind, LocalBackend, MemoryBackend, PermissionState, RemoveOptions,
    UnderlyingFileSystem, VfsError, VfsResult, VfsStorage,
};

// ============================================================================
// Shared test setup
// ============================================================================

const CREATE: GetDirectoryOptions = GetDirectoryOptions { create: true };
const CREATE_FILE: GetFileOptions = GetFileOptions { create: true };

fn memory_fs() -> FileSystem {
    FileSystem::builder(VfsStorage::new().with_root("mem", MemoryBackend::new())).build()
}

fn local_fs(dir: &TempDir) -> FileSystem {
    FileSystem::builder(VfsStorage::new().with_root("disk", LocalBackend::new(dir.path()))).build()
}

/// Child names in sorted order, duplicates kept.
async fn names(dir: &FileSystemDirectoryHandle) -> Vec<String> {
    let mut names: Vec<String> = dir
        .keys()
        .map(|r| r.expect("iteration failed"))
        .collect()
        .await;
    names.sort();
    names
}

// ============================================================================
// Tier 1: memory root
// ============================================================================

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");

    let a = root.get_directory_handle("docs", CREATE).await.unwrap();
    let b = root.get_directory_handle("docs", CREATE).await.unwrap();
    assert!(a.is_same_entry(&b).await.unwrap());

    let f1 = a.get_file_handle("x.txt", CREATE_FILE).await.unwrap();
    let f2 = a.get_file_handle("x.txt", GetFileOptions::default()).await.unwrap();
    assert!(f1.is_same_entry(&f2).await.unwrap());
    assert_eq!(f1.kind(), HandleKind::File);
    assert_eq!(f1.name(), "x.txt");

    assert_eq!(names(&a).await, vec!["x.txt"]);
}

#[tokio::test]
async fn test_missing_child_without_create() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");

    let err = root
        .get_file_handle("nope.txt", GetFileOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
    assert_eq!(err.name(), "NotFoundError");
}

#[tokio::test]
async fn test_type_mismatch() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    root.get_directory_handle("d", CREATE).await.unwrap();
    root.get_file_handle("f", CREATE_FILE).await.unwrap();

    let err = root.get_file_handle("d", CREATE_FILE).await.unwrap_err();
    assert!(matches!(err, FsError::TypeMismatch(_)));
    let err = root
        .get_directory_handle("f", GetDirectoryOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.name(), "TypeMismatchError");
}

#[tokio::test]
async fn test_invalid_names_rejected() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    for name in ["", ".", "..", "a/b", "/"] {
        let err = root.get_file_handle(name, CREATE_FILE).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidName(_)), "{name:?}: {err:?}");
        assert_eq!(err.name(), "TypeError");
    }
    assert!(names(&root).await.is_empty());
}

#[tokio::test]
async fn test_handle_on_removed_directory_is_not_found() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    let sub = root.get_directory_handle("sub", CREATE).await.unwrap();
    root.remove_entry("sub", RemoveOptions::default()).await.unwrap();

    let err = sub.get_file_handle("a", CREATE_FILE).await.unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
}

#[tokio::test]
async fn test_remove_non_recursive_and_recursive() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    let full = root.get_directory_handle("full", CREATE).await.unwrap();
    full.get_file_handle("inner", CREATE_FILE).await.unwrap();
    root.get_directory_handle("empty", CREATE).await.unwrap();

    let err = root
        .remove_entry("full", RemoveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::InvalidModification(_)));

    root.remove_entry("empty", RemoveOptions::default()).await.unwrap();
    root.remove_entry("full", RemoveOptions { recursive: true })
        .await
        .unwrap();
    assert!(names(&root).await.is_empty());

    let err = root
        .remove_entry("full", RemoveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
    let err = root
        .get_directory_handle("full", GetDirectoryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
    assert!(full.get_file_handle("inner", GetFileOptions::default()).await.is_err());
}

#[tokio::test]
async fn test_iteration_names_each_child_exactly_once() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    for name in ["c", "a", "b"] {
        root.get_file_handle(name, CREATE_FILE).await.unwrap();
    }

    assert_eq!(names(&root).await, vec!["a", "b", "c"]);
    let mut from_entries: Vec<String> = root
        .entries()
        .collect()
        .await
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    from_entries.sort();
    assert_eq!(from_entries, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_iteration_yields_every_child_once() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    for i in 0..5 {
        root.get_file_handle(&format!("f{i}"), CREATE_FILE).await.unwrap();
    }
    root.get_directory_handle("d", CREATE).await.unwrap();

    let entries = root.entries().collect().await.unwrap();
    assert_eq!(entries.len(), 6);
    let kinds: Vec<_> = entries
        .iter()
        .filter(|(_, h)| h.kind() == HandleKind::Directory)
        .map(|(n, _)| n.as_str())
        .collect();
    assert_eq!(kinds, vec!["d"]);

    let values: Vec<_> = root.values().collect().await;
    assert_eq!(values.len(), 6);
}

#[tokio::test]
async fn test_iteration_sees_children_added_midway() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    root.get_file_handle("a", CREATE_FILE).await.unwrap();

    let mut iter = root.entries();
    let (first, _) = iter.next().await.unwrap().unwrap();
    assert_eq!(first, "a");

    root.get_file_handle("b", CREATE_FILE).await.unwrap();
    let (second, _) = iter.next().await.unwrap().unwrap();
    assert_eq!(second, "b");
    assert!(iter.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_resolve() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    let a = root.get_directory_handle("a", CREATE).await.unwrap();
    let b = a.get_directory_handle("b", CREATE).await.unwrap();
    let f = b.get_file_handle("f.txt", CREATE_FILE).await.unwrap();

    assert_eq!(
        root.resolve(&f).await.unwrap(),
        Some(vec!["a".to_string(), "b".to_string(), "f.txt".to_string()])
    );
    assert_eq!(a.resolve(&a).await.unwrap(), Some(Vec::new()));
    assert_eq!(b.resolve(&a).await.unwrap(), None);

    let other = fs.bucket_root("elsewhere");
    assert_eq!(other.resolve(&f).await.unwrap(), None);
}

#[tokio::test]
async fn test_is_same_entry_compares_kind_and_root() {
    let fs = memory_fs();
    let file = fs.file_handle("mem", ["x"]);
    let dir = fs.directory_handle("mem", ["x"]);
    let other_root = fs.file_handle("other", ["x"]);
    assert!(!file.is_same_entry(&dir).await.unwrap());
    assert!(!file.is_same_entry(&other_root).await.unwrap());
    assert!(file.is_same_entry(&fs.file_handle("mem", ["x"])).await.unwrap());
}

#[tokio::test]
async fn test_permissions_default_granted() {
    let fs = memory_fs();
    let root = fs.bucket_root("mem");
    assert_eq!(
        root.query_permission(AccessMode::Readwrite).await.unwrap(),
        PermissionState::Granted
    );
}

// ============================================================================
// Tier 2: local root
// ============================================================================

#[tokio::test]
async fn test_local_create_and_remove_reach_disk() {
    let dir = TempDir::new().unwrap();
    let fs = local_fs(&dir);
    let root = fs.root_directory("disk");

    let sub = root.get_directory_handle("sub", CREATE).await.unwrap();
    sub.get_file_handle("note.md", CREATE_FILE).await.unwrap();
    assert!(dir.path().join("sub/note.md").is_file());

    root.remove_entry("sub", RemoveOptions { recursive: true })
        .await
        .unwrap();
    assert!(!dir.path().join("sub").exists());
}

#[tokio::test]
async fn test_local_iteration_picks_up_existing_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    let fs = local_fs(&dir);

    let root = fs.root_directory("disk");
    assert_eq!(
        names(&root).await,
        vec!["a.txt", "nested"]
    );

    let text = root
        .get_file_handle("a.txt", GetFileOptions::default())
        .await
        .unwrap()
        .get_file()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(text, "a");
}

// ============================================================================
// Tier 3: collaborator failures
// ============================================================================

/// Denies everything and counts how often it was asked.
#[derive(Default)]
struct DenyAll {
    calls: AtomicUsize,
}

#[async_trait]
impl AccessControl for DenyAll {
    async fn query_access(&self, _locator: &FileSystemLocator, _mode: AccessMode) -> AccessResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        AccessResult::denied()
    }

    async fn request_access(&self, _locator: &FileSystemLocator, _mode: AccessMode) -> AccessResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        AccessResult::new(PermissionState::Denied, "SecurityError")
    }
}

#[tokio::test]
async fn test_access_denied_carries_error_name() {
    let deny = Arc::new(DenyAll::default());
    let fs = FileSystem::builder(VfsStorage::new().with_root("mem", MemoryBackend::new()))
        .access_arc(deny.clone())
        .build();
    let root = fs.bucket_root("mem");

    let err = root
        .get_file_handle("x", GetFileOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::AccessDenied(_)));
    assert_eq!(err.name(), "NotAllowedError");

    let err = root.get_file_handle("x", CREATE_FILE).await.unwrap_err();
    assert_eq!(err.name(), "SecurityError");
    assert_eq!(deny.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_entry_skips_access_check() {
    let deny = Arc::new(DenyAll::default());
    let fs = FileSystem::builder(VfsStorage::new().with_root("mem", MemoryBackend::new()))
        .access_arc(deny.clone())
        .build();

    let ghost = fs.directory_handle("mem", ["ghost"]);
    let err = ghost
        .get_file_handle("x", GetFileOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
    assert_eq!(deny.calls.load(Ordering::SeqCst), 0);
}

/// Mutation side that refuses to create or remove anything.
struct Broken;

#[async_trait]
impl UnderlyingFileSystem for Broken {
    async fn create(&self, _entry: &FileSystemEntry, _parent: &FileSystemLocator) -> VfsResult<()> {
        Err(VfsError::Other("disk on fire".into()))
    }

    async fn remove(&self, _entry: &FileSystemEntry, _parent: &FileSystemLocator) -> VfsResult<()> {
        Err(VfsError::PermissionDenied("sealed".into()))
    }

    async fn write(&self, _locator: &FileSystemLocator, _data: &[u8]) -> VfsResult<()> {
        Err(VfsError::ReadOnly)
    }
}

fn broken_fs(storage: Arc<VfsStorage>) -> FileSystem {
    let io: Arc<dyn EntryIo> = storage;
    FileSystemBuilder::from_parts(io, Arc::new(Broken)).build()
}

#[tokio::test]
async fn test_storage_failure_does_not_add_child() {
    let storage = Arc::new(VfsStorage::new().with_root("mem", MemoryBackend::new()));
    let fs = broken_fs(storage);
    let root = fs.bucket_root("mem");

    let err = root.get_directory_handle("d", CREATE).await.unwrap_err();
    assert!(matches!(err, FsError::Storage(VfsError::Other(_))));
    assert_eq!(err.name(), "OperationError");
    assert!(names(&root).await.is_empty());
}

#[tokio::test]
async fn test_storage_failure_keeps_removed_child() {
    let storage = Arc::new(VfsStorage::new().with_root("mem", MemoryBackend::new()));
    memory_fs_over(&storage)
        .bucket_root("mem")
        .get_file_handle("keep", CREATE_FILE)
        .await
        .unwrap();

    let fs = broken_fs(storage);
    let root = fs.bucket_root("mem");
    let err = root
        .remove_entry("keep", RemoveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::Storage(VfsError::PermissionDenied(_))));
    assert_eq!(names(&root).await, vec!["keep"]);
}

fn memory_fs_over(storage: &Arc<VfsStorage>) -> FileSystem {
    FileSystemBuilder::new(Arc::clone(storage)).build()
}
