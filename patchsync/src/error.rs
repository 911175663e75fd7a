//! Error types for the sync engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse classification of a [`SyncError`].
///
/// Every failure of a run falls into one of these four classes. All of them
/// are terminal for the run; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration. The run never starts.
    Config,
    /// The manifest could not be fetched or parsed.
    Manifest,
    /// A local read, hash, or directory operation failed.
    Io,
    /// A file transfer failed.
    Download,
}

/// Errors that can occur while synchronizing a directory tree.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid or incomplete configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failed to fetch or parse the manifest.
    #[error("failed to load manifest from {url}: {reason}")]
    Manifest { url: String, reason: String },

    /// The manifest request did not complete in time.
    #[error("manifest request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Local filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to download a file.
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// A manifest entry would resolve outside the local root.
    #[error("unsafe manifest path rejected: {path}")]
    UnsafePath { path: String },

    /// A failure while processing a specific manifest entry.
    #[error("{path}: {source}")]
    Entry {
        path: String,
        #[source]
        source: Box<SyncError>,
    },

    /// A run is already active on this engine.
    #[error("a sync run is already in progress")]
    AlreadyRunning,

    /// The worker thread could not be started or terminated abnormally.
    #[error("sync worker failed: {0}")]
    Worker(String),
}

impl SyncError {
    /// Build an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the manifest entry that was being processed.
    pub fn for_entry(self, path: impl Into<String>) -> Self {
        match self {
            already @ Self::Entry { .. } => already,
            other => Self::Entry {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// Classify this error into the four failure classes of a run.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::AlreadyRunning | Self::Worker(_) => ErrorKind::Config,
            Self::Manifest { .. } | Self::Timeout { .. } | Self::UnsafePath { .. } => {
                ErrorKind::Manifest
            }
            Self::Io { .. } => ErrorKind::Io,
            Self::Download { .. } => ErrorKind::Download,
            Self::Entry { source, .. } => source.kind(),
        }
    }

    /// The manifest entry this error is attached to, if any.
    pub fn entry_path(&self) -> Option<&str> {
        match self {
            Self::Entry { path, .. } => Some(path),
            _ => None,
        }
    }
}
