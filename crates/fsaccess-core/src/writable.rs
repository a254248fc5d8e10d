//! Writable file streams.
//!
//! A stream edits a private buffer; nothing reaches storage until
//! [`FileSystemWritableFileStream::close`]. The file's shared lock is held
//! from creation until close, abort or drop.

use fsaccess_types::{AccessMode, FileSystemLocator};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::entry::locate_entry;
use crate::error::{resize_zeroed, FsError, FsResult};
use crate::filesystem::FileSystem;

/// One operation on a writable stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCommand {
    /// Write `data` at `position`, or at the current offset when `None`.
    Write { data: Vec<u8>, position: Option<u64> },
    /// Move the current offset.
    Seek { position: u64 },
    /// Resize the buffer, zero-filling when it grows.
    Truncate { size: u64 },
}

impl From<Vec<u8>> for WriteCommand {
    fn from(data: Vec<u8>) -> Self {
        WriteCommand::Write {
            data,
            position: None,
        }
    }
}

impl From<&[u8]> for WriteCommand {
    fn from(data: &[u8]) -> Self {
        data.to_vec().into()
    }
}

impl From<&str> for WriteCommand {
    fn from(data: &str) -> Self {
        data.as_bytes().into()
    }
}

impl From<String> for WriteCommand {
    fn from(data: String) -> Self {
        data.into_bytes().into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Writable,
    Closing,
    Closed,
    Aborted,
}

#[derive(Debug)]
struct WriteBuffer {
    data: Vec<u8>,
    seek_offset: u64,
    state: StreamState,
}

impl WriteBuffer {
    fn ensure_writable(&self) -> FsResult<()> {
        match self.state {
            StreamState::Writable => Ok(()),
            other => Err(FsError::invalid_state(format!("stream is {other:?}"))),
        }
    }

    fn apply(&mut self, command: WriteCommand) -> FsResult<()> {
        self.ensure_writable()?;
        match command {
            WriteCommand::Write { data, position } => {
                let start = position.unwrap_or(self.seek_offset);
                let end = start
                    .checked_add(data.len() as u64)
                    .ok_or_else(|| FsError::invalid_argument("write extends past u64"))?;
                if end > self.data.len() as u64 {
                    resize_zeroed(&mut self.data, end)?;
                }
                let (start, end) = (start as usize, end as usize);
                self.data[start..end].copy_from_slice(&data);
                self.seek_offset = end as u64;
            }
            WriteCommand::Seek { position } => {
                self.seek_offset = position;
            }
            WriteCommand::Truncate { size } => {
                resize_zeroed(&mut self.data, size)?;
                self.seek_offset = self.seek_offset.min(size);
            }
        }
        Ok(())
    }
}

/// Buffered writer for one file.
pub struct FileSystemWritableFileStream {
    file: FileSystemLocator,
    fs: FileSystem,
    buffer: Arc<Mutex<WriteBuffer>>,
}

impl std::fmt::Debug for FileSystemWritableFileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemWritableFileStream")
            .field("file", &self.file)
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl FileSystemWritableFileStream {
    pub(crate) fn new(file: FileSystemLocator, fs: FileSystem, data: Vec<u8>) -> Self {
        Self {
            file,
            fs,
            buffer: Arc::new(Mutex::new(WriteBuffer {
                data,
                seek_offset: 0,
                state: StreamState::Writable,
            })),
        }
    }

    pub fn locator(&self) -> &FileSystemLocator {
        &self.file
    }

    /// Current write offset.
    pub fn position(&self) -> u64 {
        self.buffer.lock().seek_offset
    }

    /// Current buffer length.
    pub fn len(&self) -> u64 {
        self.buffer.lock().data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write at the current offset, or apply any [`WriteCommand`].
    pub async fn write(&mut self, data: impl Into<WriteCommand>) -> FsResult<()> {
        self.write_command(data.into()).await
    }

    pub async fn write_at(&mut self, position: u64, data: impl Into<Vec<u8>>) -> FsResult<()> {
        self.write_command(WriteCommand::Write {
            data: data.into(),
            position: Some(position),
        })
        .await
    }

    pub async fn seek(&mut self, position: u64) -> FsResult<()> {
        self.write_command(WriteCommand::Seek { position }).await
    }

    pub async fn truncate(&mut self, size: u64) -> FsResult<()> {
        self.write_command(WriteCommand::Truncate { size }).await
    }

    #[tracing::instrument(skip(self, command), fields(file = %self.file))]
    pub async fn write_command(&mut self, command: WriteCommand) -> FsResult<()> {
        let fs = self.fs.clone();
        let file = self.file.clone();
        let buffer = Arc::clone(&self.buffer);
        self.fs
            .queue()
            .run(move || apply_command(fs, file, buffer, command))
            .await?
    }

    /// Persist the buffer as the file's contents and release the lock.
    ///
    /// The lock is released whether or not persisting succeeds.
    #[tracing::instrument(skip(self), fields(file = %self.file))]
    pub async fn close(&mut self) -> FsResult<()> {
        let fs = self.fs.clone();
        let file = self.file.clone();
        let buffer = Arc::clone(&self.buffer);
        self.fs
            .queue()
            .run(move || close_stream(fs, file, buffer))
            .await?
    }

    /// Discard the buffer and release the lock. No-op once closed.
    #[tracing::instrument(skip(self), fields(file = %self.file))]
    pub async fn abort(&mut self) -> FsResult<()> {
        let fs = self.fs.clone();
        let file = self.file.clone();
        let buffer = Arc::clone(&self.buffer);
        self.fs
            .queue()
            .run(move || async move {
                if abandon(&buffer) {
                    fs.ctx().locks.release(&file);
                }
            })
            .await
    }
}

impl Drop for FileSystemWritableFileStream {
    fn drop(&mut self) {
        if abandon(&self.buffer) {
            tracing::warn!(file = %self.file, "writable stream dropped without close; changes discarded");
            self.fs.ctx().locks.release(&self.file);
        }
    }
}

/// Move a writable buffer to aborted. Returns true if it was writable.
fn abandon(buffer: &Mutex<WriteBuffer>) -> bool {
    let mut b = buffer.lock();
    if b.state != StreamState::Writable {
        return false;
    }
    b.state = StreamState::Aborted;
    b.data = Vec::new();
    true
}

async fn apply_command(
    fs: FileSystem,
    file: FileSystemLocator,
    buffer: Arc<Mutex<WriteBuffer>>,
    command: WriteCommand,
) -> FsResult<()> {
    buffer.lock().ensure_writable()?;

    let access = fs.ctx().access.query_access(&file, AccessMode::Readwrite).await;
    if !access.is_granted() {
        return Err(FsError::access_denied(access.error_name));
    }

    buffer.lock().apply(command)
}

async fn close_stream(
    fs: FileSystem,
    file: FileSystemLocator,
    buffer: Arc<Mutex<WriteBuffer>>,
) -> FsResult<()> {
    let data = {
        let mut b = buffer.lock();
        b.ensure_writable()?;
        b.state = StreamState::Closing;
        std::mem::take(&mut b.data)
    };

    let result = persist(&fs, &file, data).await;
    fs.ctx().locks.release(&file);
    buffer.lock().state = match result {
        Ok(()) => StreamState::Closed,
        Err(_) => StreamState::Aborted,
    };
    result
}

async fn persist(fs: &FileSystem, file: &FileSystemLocator, data: Vec<u8>) -> FsResult<()> {
    let access = fs.ctx().access.query_access(file, AccessMode::Readwrite).await;
    if !access.is_granted() {
        return Err(FsError::access_denied(access.error_name));
    }

    let mut entry = locate_entry(file, fs.ctx())
        .await?
        .and_then(|e| e.into_file())
        .ok_or_else(|| FsError::not_found(file.to_string()))?;
    entry.set_binary_data(data).await
}
