//! Run state tracking.
//!
//! This module provides types for tracking a single sync run: its lifecycle
//! state, counters, and the outcome reported once it terminates.

use std::fmt;

use crate::cancel::CancelFlag;
use crate::error::{ErrorKind, SyncError};

/// Lifecycle state of a run.
///
/// `Idle → Running → {Succeeded, Failed, Cancelled}`. Terminal states are
/// final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not started yet.
    Idle,
    /// Processing the manifest.
    Running,
    /// Every entry was reconciled.
    Succeeded,
    /// An error aborted the run.
    Failed,
    /// Cancellation was observed before the run finished.
    Cancelled,
}

impl RunState {
    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Mutable state of one run.
#[derive(Debug, Clone)]
pub struct SyncRun {
    /// Cancellation flag shared with the controlling thread.
    pub cancel: CancelFlag,
    /// Lifecycle state.
    pub state: RunState,
    /// Number of entries in the manifest.
    pub total_entries: usize,
    /// Entries fully processed (verified or downloaded).
    pub completed_count: usize,
    /// Entries that had to be downloaded.
    pub downloaded_count: usize,
    /// Total bytes written by transfers.
    pub bytes_downloaded: u64,
    /// Path of the last entry that was processed.
    pub last_processed: Option<String>,
    /// Display text of the error that failed the run.
    pub last_error: Option<String>,
    /// Class of the error that failed the run.
    pub error_kind: Option<ErrorKind>,
    /// Manifest entry being processed when the run failed.
    pub failed_entry: Option<String>,
}

impl SyncRun {
    /// Create an idle run.
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            state: RunState::Idle,
            total_entries: 0,
            completed_count: 0,
            downloaded_count: 0,
            bytes_downloaded: 0,
            last_processed: None,
            last_error: None,
            error_kind: None,
            failed_entry: None,
        }
    }

    /// Transition to `Running`.
    ///
    /// Returns `false` if the run already left `Idle`.
    pub fn begin(&mut self) -> bool {
        if self.state != RunState::Idle {
            return false;
        }
        self.state = RunState::Running;
        true
    }

    /// Record an entry that was already up to date.
    pub fn record_verified(&mut self, path: &str) {
        self.completed_count += 1;
        self.last_processed = Some(path.to_string());
    }

    /// Record an entry that was downloaded.
    pub fn record_download(&mut self, path: &str, bytes: u64) {
        self.downloaded_count += 1;
        self.bytes_downloaded += bytes;
        self.record_verified(path);
    }

    /// Progress as a whole percentage of completed entries, rounded down.
    ///
    /// An empty run counts as complete.
    pub fn progress_percent(&self) -> u8 {
        progress_percent(self.completed_count, self.total_entries)
    }

    /// Move to a terminal state. Terminal states are never left.
    pub fn finish(&mut self, state: RunState) {
        if !self.state.is_terminal() && state.is_terminal() {
            self.state = state;
        }
    }

    /// Mark the run failed with `error`.
    pub fn fail(&mut self, error: &SyncError) {
        if !self.state.is_terminal() {
            self.last_error = Some(error.to_string());
            self.error_kind = Some(error.kind());
            self.failed_entry = error.entry_path().map(str::to_string);
            self.state = RunState::Failed;
        }
    }

    /// Snapshot the outcome of the run.
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            state: self.state,
            total_entries: self.total_entries,
            completed_count: self.completed_count,
            downloaded_count: self.downloaded_count,
            bytes_downloaded: self.bytes_downloaded,
            last_processed: self.last_processed.clone(),
            error: self.last_error.clone(),
            error_kind: self.error_kind,
            failed_entry: self.failed_entry.clone(),
        }
    }
}

/// `floor(done * 100 / total)`, or 100 when `total` is zero.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (done.min(total) as u128 * 100) / total as u128;
    percent as u8
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Terminal state.
    pub state: RunState,
    /// Number of entries in the manifest.
    pub total_entries: usize,
    /// Entries fully processed.
    pub completed_count: usize,
    /// Entries that were downloaded.
    pub downloaded_count: usize,
    /// Total bytes written.
    pub bytes_downloaded: u64,
    /// Path of the last processed entry.
    pub last_processed: Option<String>,
    /// Error text when the run failed.
    pub error: Option<String>,
    /// Class of the failure.
    pub error_kind: Option<ErrorKind>,
    /// Manifest entry the failure is attached to, if any.
    pub failed_entry: Option<String>,
}

impl RunOutcome {
    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Whether the run stopped because of cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.state == RunState::Cancelled
    }
}
