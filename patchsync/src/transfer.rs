//! Streaming file transfer.
//!
//! Downloads replace the destination file wholesale. There is no resume and
//! no atomic rename: a cancelled or failed transfer can leave a partial file,
//! which the next run detects through its hash and downloads again.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::cancel::CancelFlag;
use crate::error::{SyncError, SyncResult};
use crate::transport::HttpTransport;

/// Default chunk size for streaming transfers (128KB).
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Result of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The whole body was written.
    Completed { bytes: u64 },
    /// Cancellation was observed between chunks; `bytes` were written.
    Cancelled { bytes: u64 },
}

impl TransferOutcome {
    /// Bytes written to the destination.
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Completed { bytes } | Self::Cancelled { bytes } => *bytes,
        }
    }
}

/// Streams remote resources to local files.
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn HttpTransport>,
    chunk_size: usize,
}

impl Downloader {
    /// Create a downloader with the default chunk size.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_chunk_size(transport, DEFAULT_CHUNK_SIZE)
    }

    /// Create a downloader with a custom chunk size.
    pub fn with_chunk_size(transport: Arc<dyn HttpTransport>, chunk_size: usize) -> Self {
        Self {
            transport,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Chunk size used for each read.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Download `url` to `dest`.
    ///
    /// Parent directories are created first. `cancel` is checked before each
    /// chunk read; on cancellation the transfer stops immediately and the
    /// partial file is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the parent directories cannot be created
    /// and [`SyncError::Download`] for any network or write failure.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancelFlag,
    ) -> SyncResult<TransferOutcome> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }

        let download_error = |reason: String| SyncError::Download {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .transport
            .get(url, None)
            .map_err(|e| download_error(e.to_string()))?;

        if !response.is_success() {
            return Err(download_error(format!(
                "GET request failed with status {}",
                response.status
            )));
        }

        let file = File::create(dest)
            .map_err(|e| download_error(format!("cannot write {}: {}", dest.display(), e)))?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut written = 0u64;

        loop {
            if cancel.is_cancelled() {
                writer.flush().map_err(|e| {
                    download_error(format!("cannot write {}: {}", dest.display(), e))
                })?;
                debug!(url, bytes = written, "Transfer cancelled");
                return Ok(TransferOutcome::Cancelled { bytes: written });
            }

            let bytes_read = response
                .body
                .read(&mut buffer)
                .map_err(|e| download_error(format!("read error: {}", e)))?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| download_error(format!("cannot write {}: {}", dest.display(), e)))?;

            written += bytes_read as u64;
        }

        writer
            .flush()
            .map_err(|e| download_error(format!("cannot write {}: {}", dest.display(), e)))?;

        debug!(url, bytes = written, "Transfer complete");
        Ok(TransferOutcome::Completed { bytes: written })
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}
