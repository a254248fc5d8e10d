//! Synchronous access handles.
//!
//! The handle holds the file's exclusive lock and an in-memory copy of its
//! contents. Reads, writes and truncation act on the copy without awaiting;
//! [`FileSystemSyncAccessHandle::flush`] and
//! [`FileSystemSyncAccessHandle::close`] go through the file system queue to
//! persist it.

use fsaccess_types::FileSystemLocator;

use crate::entry::locate_entry;
use crate::error::{resize_zeroed, FsError, FsResult};
use crate::filesystem::FileSystem;

/// Exclusive read/write handle on a file.
pub struct FileSystemSyncAccessHandle {
    file: FileSystemLocator,
    fs: FileSystem,
    data: Vec<u8>,
    cursor: u64,
    dirty: bool,
    closed: bool,
}

impl std::fmt::Debug for FileSystemSyncAccessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemSyncAccessHandle")
            .field("file", &self.file)
            .field("size", &self.data.len())
            .field("cursor", &self.cursor)
            .field("dirty", &self.dirty)
            .field("closed", &self.closed)
            .finish()
    }
}

impl FileSystemSyncAccessHandle {
    pub(crate) fn new(file: FileSystemLocator, fs: FileSystem, data: Vec<u8>) -> Self {
        Self {
            file,
            fs,
            data,
            cursor: 0,
            dirty: false,
            closed: false,
        }
    }

    pub fn locator(&self) -> &FileSystemLocator {
        &self.file
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> FsResult<()> {
        if self.closed {
            Err(FsError::invalid_state(format!("sync access handle for {} is closed", self.file)))
        } else {
            Ok(())
        }
    }

    /// Read into `buf` from `at` (or the cursor). Returns bytes read; the
    /// cursor moves past them.
    pub fn read(&mut self, buf: &mut [u8], at: Option<u64>) -> FsResult<usize> {
        self.ensure_open()?;
        let len = self.data.len();
        let start = usize::try_from(at.unwrap_or(self.cursor)).unwrap_or(len).min(len);
        let n = buf.len().min(len - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.cursor = (start + n) as u64;
        Ok(n)
    }

    /// Write `data` at `at` (or the cursor), zero-filling any gap. Returns
    /// bytes written; the cursor moves past them.
    pub fn write(&mut self, data: &[u8], at: Option<u64>) -> FsResult<usize> {
        self.ensure_open()?;
        let start = at.unwrap_or(self.cursor);
        let end = start
            .checked_add(data.len() as u64)
            .ok_or_else(|| FsError::invalid_argument("write extends past u64"))?;
        if end > self.data.len() as u64 {
            resize_zeroed(&mut self.data, end)?;
        }
        self.data[start as usize..end as usize].copy_from_slice(data);
        self.cursor = end;
        self.dirty = true;
        Ok(data.len())
    }

    /// Resize to `new_size`, zero-filling when growing. The cursor is clamped.
    pub fn truncate(&mut self, new_size: u64) -> FsResult<()> {
        self.ensure_open()?;
        resize_zeroed(&mut self.data, new_size)?;
        self.cursor = self.cursor.min(new_size);
        self.dirty = true;
        Ok(())
    }

    pub fn get_size(&self) -> FsResult<u64> {
        self.ensure_open()?;
        Ok(self.data.len() as u64)
    }

    /// Persist the in-memory contents, if anything changed since the last
    /// flush.
    #[tracing::instrument(skip(self), fields(file = %self.file))]
    pub async fn flush(&mut self) -> FsResult<()> {
        self.ensure_open()?;
        if !self.dirty {
            return Ok(());
        }
        let fs = self.fs.clone();
        let file = self.file.clone();
        let data = self.data.clone();
        self.fs
            .queue()
            .run(move || persist(fs, file, data))
            .await??;
        self.dirty = false;
        Ok(())
    }

    /// Flush and release the lock. Closing twice is a no-op.
    ///
    /// The lock is released even when the final flush fails.
    #[tracing::instrument(skip(self), fields(file = %self.file))]
    pub async fn close(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let fs = self.fs.clone();
        let file = self.file.clone();
        let data = self.dirty.then(|| std::mem::take(&mut self.data));
        self.fs
            .queue()
            .run(move || async move {
                let result = match data {
                    Some(data) => persist(fs.clone(), file.clone(), data).await,
                    None => Ok(()),
                };
                fs.ctx().locks.release(&file);
                result
            })
            .await?
    }
}

impl Drop for FileSystemSyncAccessHandle {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(file = %self.file, "sync access handle dropped without close; unflushed changes discarded");
            self.fs.ctx().locks.release(&self.file);
        }
    }
}

async fn persist(fs: FileSystem, file: FileSystemLocator, data: Vec<u8>) -> FsResult<()> {
    let mut entry = locate_entry(&file, fs.ctx())
        .await?
        .and_then(|e| e.into_file())
        .ok_or_else(|| FsError::not_found(file.to_string()))?;
    entry.set_binary_data(data).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{MemoryBackend, VfsStorage};

    fn handle(data: &[u8]) -> FileSystemSyncAccessHandle {
        let fs = FileSystem::builder(VfsStorage::new().with_root("b", MemoryBackend::new())).build();
        let file = FileSystemLocator::bucket_root("b").child(fsaccess_types::HandleKind::File, "f");
        FileSystemSyncAccessHandle::new(file, fs, data.to_vec())
    }

    #[tokio::test]
    async fn test_read_write_cursor() {
        let mut h = handle(b"hello");
        let mut buf = [0u8; 3];
        assert_eq!(h.read(&mut buf, None).unwrap(), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(h.read(&mut buf, None).unwrap(), 2);
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(h.read(&mut buf, None).unwrap(), 0);

        assert_eq!(h.write(b"!", None).unwrap(), 1);
        assert_eq!(h.get_size().unwrap(), 6);
    }

    #[tokio::test]
    async fn test_write_at_gap_zero_fills() {
        let mut h = handle(b"ab");
        h.write(b"z", Some(4)).unwrap();
        let mut buf = [9u8; 8];
        let n = h.read(&mut buf, Some(0)).unwrap();
        assert_eq!(&buf[..n], b"ab\0\0z");
    }

    #[tokio::test]
    async fn test_read_past_end_is_empty() {
        let mut h = handle(b"ab");
        let mut buf = [0u8; 4];
        assert_eq!(h.read(&mut buf, Some(10)).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_truncate() {
        let mut h = handle(b"abcdef");
        h.truncate(3).unwrap();
        assert_eq!(h.get_size().unwrap(), 3);
        h.truncate(5).unwrap();
        let mut buf = [1u8; 5];
        h.read(&mut buf, Some(0)).unwrap();
        assert_eq!(&buf, b"abc\0\0");
    }

    #[tokio::test]
    async fn test_oversized_write_is_an_error() {
        let mut h = handle(b"ab");
        let err = h.write(b"x", Some(1 << 63)).unwrap_err();
        assert!(matches!(err, FsError::QuotaExceeded(_)));
        assert!(matches!(h.truncate(u64::MAX), Err(FsError::QuotaExceeded(_))));
        assert!(matches!(h.write(b"x", Some(u64::MAX)), Err(FsError::InvalidArgument(_))));

        // The handle is untouched and still usable.
        assert_eq!(h.get_size().unwrap(), 2);
        h.write(b"c", None).unwrap();
        let mut buf = [0u8; 2];
        h.read(&mut buf, Some(0)).unwrap();
        assert_eq!(&buf, b"cb");
    }

    #[tokio::test]
    async fn test_closed_rejects_sync_ops() {
        let mut h = handle(b"");
        h.closed = true;
        assert!(matches!(h.get_size(), Err(FsError::InvalidState(_))));
        assert!(matches!(h.write(b"x", None), Err(FsError::InvalidState(_))));
        // Second close is a no-op.
        h.close().await.unwrap();
    }
}
