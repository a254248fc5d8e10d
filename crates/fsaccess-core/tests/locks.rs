//! Integration tests for writers: writable streams, sync access handles,
//! the locks they hold and the snapshots they invalidate.

use tempfile::TempDir;

use fsaccess_core::{
    AccessMode, CreateWritableOptions, FileSystem, FileSystemConfig, FileSystemFileHandle,
    FsError, GetFileOptions, LocalBackend, LockState, MemoryBackend, PermissionState, VfsStorage,
    WriteCommand,
};

// ============================================================================
// Shared test setup
// ============================================================================

fn bucket_fs() -> FileSystem {
    FileSystem::builder(VfsStorage::new().with_root("b", MemoryBackend::new())).build()
}

async fn bucket_file(fs: &FileSystem, name: &str) -> FileSystemFileHandle {
    fs.bucket_root("b")
        .get_file_handle(name, GetFileOptions { create: true })
        .await
        .unwrap()
}

async fn read_text(file: &FileSystemFileHandle) -> String {
    file.get_file().await.unwrap().text().await.unwrap()
}

// ============================================================================
// Writable streams
// ============================================================================

#[tokio::test]
async fn test_writable_close_persists() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "notes.txt").await;

    let mut stream = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    stream.write("hello ").await.unwrap();
    stream.write("world").await.unwrap();
    assert_eq!(read_text(&file).await, "", "nothing persisted before close");

    stream.close().await.unwrap();
    assert_eq!(read_text(&file).await, "hello world");
    assert_eq!(fs.locks().held(), 0);
}

#[tokio::test]
async fn test_writable_keep_existing_data() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "log").await;

    let mut first = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    first.write("abc").await.unwrap();
    first.close().await.unwrap();

    let mut second = file
        .create_writable(CreateWritableOptions { keep_existing_data: true })
        .await
        .unwrap();
    assert_eq!(second.len(), 3);
    second.seek(3).await.unwrap();
    second.write("def").await.unwrap();
    second
        .write(WriteCommand::Write { data: b"X".to_vec(), position: Some(0) })
        .await
        .unwrap();
    second.close().await.unwrap();
    assert_eq!(read_text(&file).await, "Xbcdef");
}

#[tokio::test]
async fn test_writable_abort_discards_and_unlocks() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "draft").await;

    let mut stream = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    stream.write("scrap").await.unwrap();
    stream.abort().await.unwrap();

    assert_eq!(read_text(&file).await, "");
    assert_eq!(fs.locks().held(), 0);
    let err = stream.write("more").await.unwrap_err();
    assert!(matches!(err, FsError::InvalidState(_)));
}

#[tokio::test]
async fn test_writable_streams_share_the_lock() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "shared").await;

    let a = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    let b = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    let lock = fs.locks().get(file.locator());
    assert_eq!(lock.state, LockState::TakenShared);
    assert_eq!(lock.shared_count, 2);

    drop(a);
    assert_eq!(fs.locks().get(file.locator()).shared_count, 1);
    drop(b);
    assert_eq!(fs.locks().held(), 0);
}

#[tokio::test]
async fn test_oversized_write_leaves_queue_running() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "huge").await;

    let mut stream = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    stream.seek(1 << 63).await.unwrap();
    let err = stream.write("x").await.unwrap_err();
    assert!(matches!(err, FsError::QuotaExceeded(_)));
    assert_eq!(err.name(), "QuotaExceededError");

    // The stream and the rest of the file system keep working.
    stream.seek(0).await.unwrap();
    stream.write("ok").await.unwrap();
    stream.close().await.unwrap();
    assert_eq!(read_text(&file).await, "ok");
    bucket_file(&fs, "other").await;
}

// ============================================================================
// Sync access handles
// ============================================================================

#[tokio::test]
async fn test_sync_handle_flush_and_close() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "db").await;

    let mut handle = file.create_sync_access_handle().await.unwrap();
    handle.write(b"page-1", None).unwrap();
    handle.flush().await.unwrap();
    assert_eq!(read_text(&file).await, "page-1");

    handle.truncate(4).unwrap();
    handle.close().await.unwrap();
    assert!(handle.is_closed());
    assert_eq!(read_text(&file).await, "page");
    assert_eq!(fs.locks().held(), 0);

    // Closing again is fine; everything else is not.
    handle.close().await.unwrap();
    assert!(matches!(handle.flush().await, Err(FsError::InvalidState(_))));
}

#[tokio::test]
async fn test_sync_handle_oversized_write_is_an_error() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "big").await;

    let mut handle = file.create_sync_access_handle().await.unwrap();
    let err = handle.write(b"x", Some(1 << 63)).unwrap_err();
    assert!(matches!(err, FsError::QuotaExceeded(_)));
    assert_eq!(handle.get_size().unwrap(), 0);
    handle.close().await.unwrap();
    assert_eq!(fs.locks().held(), 0);
}

#[tokio::test]
async fn test_two_sync_handles_conflict() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "exclusive").await;

    let mut first = file.create_sync_access_handle().await.unwrap();
    let err = file.create_sync_access_handle().await.unwrap_err();
    assert!(matches!(err, FsError::LockConflict(_)));
    assert_eq!(err.name(), "NoModificationAllowedError");

    first.close().await.unwrap();
    let mut again = file.create_sync_access_handle().await.unwrap();
    again.close().await.unwrap();
}

#[tokio::test]
async fn test_writable_and_sync_handle_conflict() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "mixed").await;

    let stream = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    assert!(matches!(
        file.create_sync_access_handle().await,
        Err(FsError::LockConflict(_))
    ));
    drop(stream);

    let sync = file.create_sync_access_handle().await.unwrap();
    assert!(matches!(
        file.create_writable(CreateWritableOptions::default()).await,
        Err(FsError::LockConflict(_))
    ));
    drop(sync);
    assert_eq!(fs.locks().held(), 0);
}

#[tokio::test]
async fn test_sync_handle_outside_bucket_is_invalid_state() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("plain.bin"), b"").unwrap();
    let fs = FileSystem::builder(VfsStorage::new().with_root("disk", LocalBackend::new(dir.path())))
        .build();

    let file = fs.file_handle("disk", ["plain.bin"]);
    let err = file.create_sync_access_handle().await.unwrap_err();
    assert!(matches!(err, FsError::InvalidState(_)));
    assert_eq!(fs.locks().held(), 0);

    let relaxed =
        FileSystem::builder(VfsStorage::new().with_root("disk", LocalBackend::new(dir.path())))
            .sync_access_bucket_only(false)
            .build();
    let mut handle = relaxed
        .file_handle("disk", ["plain.bin"])
        .create_sync_access_handle()
        .await
        .unwrap();
    handle.write(b"ok", None).unwrap();
    handle.close().await.unwrap();
    assert_eq!(std::fs::read(dir.path().join("plain.bin")).unwrap(), b"ok");
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn test_stale_snapshot_is_not_readable() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "data").await;

    let snapshot = file.get_file().await.unwrap();
    assert_eq!(snapshot.size(), 0);
    assert_eq!(snapshot.bytes().await.unwrap(), b"");

    let mut stream = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    stream.write("changed").await.unwrap();
    stream.close().await.unwrap();

    let err = snapshot.bytes().await.unwrap_err();
    assert!(matches!(err, FsError::NotReadable(_)));
    assert_eq!(err.name(), "NotReadableError");
}

#[tokio::test]
async fn test_snapshot_of_removed_file_is_not_readable() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "gone").await;
    let snapshot = file.get_file().await.unwrap();

    fs.bucket_root("b")
        .remove_entry("gone", Default::default())
        .await
        .unwrap();
    assert!(matches!(snapshot.text().await, Err(FsError::NotReadable(_))));
}

#[tokio::test]
async fn test_snapshot_stream_and_slice() {
    let fs = bucket_fs();
    let file = bucket_file(&fs, "chunks").await;
    let mut stream = file.create_writable(CreateWritableOptions::default()).await.unwrap();
    stream.write("0123456789").await.unwrap();
    stream.close().await.unwrap();

    let snapshot = file.get_file().await.unwrap();
    let chunks: Vec<Vec<u8>> = futures::StreamExt::collect(snapshot.stream(4).await.unwrap()).await;
    assert_eq!(chunks, vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]);
    assert!(matches!(snapshot.stream(0).await, Err(FsError::InvalidArgument(_))));

    assert_eq!(snapshot.slice(2, 5).text().await.unwrap(), "234");
    assert_eq!(snapshot.slice(8, 100).text().await.unwrap(), "89");
}

// ============================================================================
// Configured permissions
// ============================================================================

#[tokio::test]
async fn test_config_prompt_rule_denies_writes() {
    let config = FileSystemConfig::from_toml_str(
        r#"
[[roots]]
id = "b"
backend = "memory"
bucket = true

[[permissions.rules]]
root = "b"
mode = "readwrite"
state = "prompt"
"#,
    )
    .unwrap();
    let fs = config.build().unwrap();
    let root = fs.root_directory("b");

    assert_eq!(
        root.query_permission(AccessMode::Read).await.unwrap(),
        PermissionState::Granted
    );
    assert_eq!(
        root.query_permission(AccessMode::Readwrite).await.unwrap(),
        PermissionState::Prompt
    );
    let err = root
        .get_file_handle("x", GetFileOptions { create: true })
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::AccessDenied(_)));
    assert_eq!(err.name(), "NotAllowedError");
}
