//! File snapshots returned by `get_file`.

use fsaccess_types::FileSystemLocator;
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;

/// Default chunk size of [`File::stream`].
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Immutable view of a file's contents at the time it was taken.
///
/// Reads fail with [`FsError::NotReadable`] once the file has been modified
/// or removed since.
#[derive(Clone)]
pub struct File {
    name: String,
    bytes: Vec<u8>,
    last_modified: SystemTime,
    locator: FileSystemLocator,
    fs: FileSystem,
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .field("last_modified", &self.last_modified)
            .field("locator", &self.locator)
            .finish()
    }
}

impl File {
    pub(crate) fn new(
        name: String,
        bytes: Vec<u8>,
        last_modified: SystemTime,
        locator: FileSystemLocator,
        fs: FileSystem,
    ) -> Self {
        Self {
            name,
            bytes,
            last_modified,
            locator,
            fs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// Sub-range `start..end` of this snapshot, clamped to its size.
    ///
    /// The slice stays tied to the same file and goes stale with it.
    pub fn slice(&self, start: u64, end: u64) -> File {
        let len = self.bytes.len();
        let start = usize::try_from(start).unwrap_or(len).min(len);
        let end = usize::try_from(end).unwrap_or(len).clamp(start, len);
        File {
            name: self.name.clone(),
            bytes: self.bytes[start..end].to_vec(),
            last_modified: self.last_modified,
            locator: self.locator.clone(),
            fs: self.fs.clone(),
        }
    }

    /// Snapshot bytes, if the file is unchanged.
    pub async fn bytes(&self) -> FsResult<Vec<u8>> {
        self.ensure_readable().await?;
        Ok(self.bytes.clone())
    }

    /// Snapshot bytes as UTF-8 (lossy), if the file is unchanged.
    pub async fn text(&self) -> FsResult<String> {
        self.ensure_readable().await?;
        Ok(String::from_utf8_lossy(&self.bytes).into_owned())
    }

    /// Snapshot bytes in chunks of at most `chunk_size`.
    ///
    /// Staleness is checked once, before the first chunk.
    pub async fn stream(&self, chunk_size: usize) -> FsResult<BoxStream<'static, Vec<u8>>> {
        if chunk_size == 0 {
            return Err(FsError::invalid_argument("chunk size must be positive"));
        }
        self.ensure_readable().await?;
        let chunks: Vec<Vec<u8>> = self.bytes.chunks(chunk_size).map(<[u8]>::to_vec).collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn ensure_readable(&self) -> FsResult<()> {
        let io = Arc::clone(&self.fs.ctx().io);
        let locator = self.locator.clone();
        let stamp = self
            .fs
            .queue()
            .run(move || async move { io.modification_timestamp(&locator).await })
            .await?;
        let current = match stamp {
            Ok(ts) => ts,
            Err(e) if e.is_not_found() => {
                return Err(FsError::not_readable(format!("{} was removed", self.locator)));
            }
            Err(e) => return Err(e.into()),
        };
        if current > self.last_modified {
            tracing::debug!(locator = %self.locator, "snapshot is stale");
            return Err(FsError::not_readable(format!(
                "{} changed since the snapshot",
                self.locator
            )));
        }
        Ok(())
    }
}
