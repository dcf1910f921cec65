//! Incremental reader over an append-only log file.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// Read position in a log file.
///
/// The offset only moves forward, except when the file is detected as
/// replaced (shrunk below the offset, or a different inode on Unix), in
/// which case reading restarts from the beginning of the new file.
#[derive(Debug, Clone)]
pub struct LogCursor {
    path: PathBuf,
    offset: u64,
    file_id: Option<u64>,
}

impl LogCursor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            file_id: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Read every complete line appended since the last call.
    ///
    /// Returns trimmed, non-empty lines. A trailing fragment without a
    /// newline is left unread until it is completed. A missing file
    /// surfaces as `io::ErrorKind::NotFound`.
    pub async fn read_new(&mut self) -> io::Result<Vec<String>> {
        self.read(false).await
    }

    /// Like [`read_new`](Self::read_new), but also returns a trailing
    /// fragment. Used for the final pass once the writer has gone.
    pub async fn read_rest(&mut self) -> io::Result<Vec<String>> {
        self.read(true).await
    }

    async fn read(&mut self, include_partial: bool) -> io::Result<Vec<String>> {
        let mut file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;
        let len = metadata.len();
        let file_id = file_identity(&metadata);

        let replaced = self.file_id.is_some() && file_id != self.file_id;
        if replaced || len < self.offset {
            debug!(path = %self.path.display(), old_offset = self.offset, len, "Log file replaced, rewinding");
            self.offset = 0;
        }
        self.file_id = file_id;

        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::with_capacity(usize::try_from(len - self.offset).unwrap_or(0));
        file.read_to_end(&mut buf).await?;

        let consumed = if include_partial {
            buf.len()
        } else {
            buf.iter().rposition(|&b| b == b'\n').map_or(0, |pos| pos + 1)
        };
        buf.truncate(consumed);
        self.offset += consumed as u64;

        Ok(String::from_utf8_lossy(&buf)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn file_identity(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}
