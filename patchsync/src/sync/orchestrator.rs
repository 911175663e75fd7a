//! Single-run reconciliation of a local directory against a manifest.
//!
//! The orchestrator fetches the manifest, then walks its entries in order:
//! verify the local file, download it when needed, report progress. The first
//! error aborts the run. Every run ends with exactly one `RunFinished` event.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::state::{RunOutcome, RunState, SyncRun};
use crate::cancel::CancelFlag;
use crate::config::{SyncConfig, SyncMode};
use crate::error::SyncResult;
use crate::events::EventEmitter;
use crate::integrity::{self, Verdict};
use crate::manifest::{FileEntry, Manifest, ManifestClient};
use crate::paths;
use crate::transfer::{Downloader, TransferOutcome};
use crate::transport::HttpTransport;

/// Status text shown when a run stops on cancellation.
pub const CANCELLED_STATUS: &str = "Update cancelled.";

/// How processing of one entry ended.
enum EntryResult {
    Verified,
    Downloaded(u64),
    Cancelled,
}

/// Drives one sync run.
///
/// An orchestrator is consumed by [`SyncOrchestrator::run`], so each instance
/// runs at most once.
pub struct SyncOrchestrator {
    config: SyncConfig,
    mode: SyncMode,
    manifests: ManifestClient,
    downloader: Downloader,
    events: EventEmitter,
    run: SyncRun,
}

impl SyncOrchestrator {
    /// Create an orchestrator for one run.
    pub fn new(
        config: SyncConfig,
        mode: SyncMode,
        transport: Arc<dyn HttpTransport>,
        events: EventEmitter,
        cancel: CancelFlag,
    ) -> Self {
        let manifests =
            ManifestClient::with_timeout(Arc::clone(&transport), config.manifest_timeout);
        let downloader = Downloader::with_chunk_size(transport, config.chunk_size);

        Self {
            config,
            mode,
            manifests,
            downloader,
            events,
            run: SyncRun::new(cancel),
        }
    }

    /// Execute the run to completion.
    ///
    /// Errors never escape: they are reported as a `LogMessage` and reflected
    /// in the returned outcome. `RunFinished` is always the last event.
    pub fn run(mut self) -> RunOutcome {
        if !self.run.begin() {
            return self.run.outcome();
        }

        info!(mode = %self.mode, "Sync run started");

        match self.execute() {
            Ok(state) => self.run.finish(state),
            Err(e) => {
                warn!(error = %e, "Sync run failed");
                self.events.log(format!("Error: {}", e));
                self.run.fail(&e);
            }
        }

        let outcome = self.run.outcome();
        info!(
            state = %outcome.state,
            completed = outcome.completed_count,
            downloaded = outcome.downloaded_count,
            bytes = outcome.bytes_downloaded,
            "Sync run finished"
        );
        self.events.finished(outcome.is_success());
        outcome
    }

    fn execute(&mut self) -> SyncResult<RunState> {
        let url = self.config.manifest_url(self.mode)?.to_string();

        self.events
            .status(format!("Fetching file list ({})...", self.mode));
        self.events.log(format!("Fetching manifest: {}", url));

        let manifest = self.manifests.fetch(&url)?;
        self.run.total_entries = manifest.len();

        if manifest.is_empty() {
            self.events.log("No files to process.");
            self.events.progress(100);
            return Ok(RunState::Succeeded);
        }

        let root = self.config.local_root();
        debug!(root = %root.display(), entries = manifest.len(), "Reconciling");

        let total = manifest.len();
        for (index, entry) in manifest.files.iter().enumerate() {
            if self.run.cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            let position = index + 1;
            let result = self
                .process_entry(&manifest, entry, &root, position, total)
                .map_err(|e| e.for_entry(display_path(&entry.path)))?;

            let shown = display_path(&entry.path);
            match result {
                EntryResult::Verified => self.run.record_verified(shown),
                EntryResult::Downloaded(bytes) => self.run.record_download(shown, bytes),
                EntryResult::Cancelled => {
                    self.events.log("Download cancelled.");
                    return Ok(self.cancelled());
                }
            }

            self.events.progress(self.run.progress_percent());
        }

        let last = self.run.last_processed.clone().unwrap_or_default();
        self.events
            .status(format!("Verified: {} ({}/{})", last, total, total));
        self.events.log("Sync completed successfully.");
        Ok(RunState::Succeeded)
    }

    fn process_entry(
        &self,
        manifest: &Manifest,
        entry: &FileEntry,
        root: &Path,
        position: usize,
        total: usize,
    ) -> SyncResult<EntryResult> {
        let shown = display_path(&entry.path);
        let local_path = paths::resolve_entry(root, &entry.path)?;

        self.events
            .status(format!("Verifying [{}/{}] {}...", position, total, shown));
        self.events.log(format!("Verifying file: {}", shown));

        let verdict = integrity::check_file(
            &local_path,
            entry.expected_hash(),
            self.config.hash_algorithm,
        )?;

        match &verdict {
            Verdict::Missing => self.events.log(" - File missing, will download."),
            Verdict::Mismatch { .. } => self.events.log(" - Hash differs, downloading again."),
            Verdict::Matches => self.events.log(" - OK (hash matches)."),
            Verdict::Trusted => {}
        }

        if !verdict.needs_download() {
            return Ok(EntryResult::Verified);
        }

        let size_text = entry
            .known_size()
            .map(|bytes| format!(" ({})", format_megabytes(bytes)))
            .unwrap_or_default();
        self.events
            .status(format!("Downloading: {}{}...", shown, size_text));

        let url = entry.download_url(manifest.base_url());
        self.events.log(format!("   -> Downloading from {}", url));

        match self.downloader.download(&url, &local_path, &self.run.cancel)? {
            TransferOutcome::Completed { bytes } => Ok(EntryResult::Downloaded(bytes)),
            TransferOutcome::Cancelled { bytes } => {
                debug!(path = shown, bytes, "Partial file left after cancellation");
                Ok(EntryResult::Cancelled)
            }
        }
    }

    fn cancelled(&self) -> RunState {
        self.events.status(CANCELLED_STATUS);
        self.events.log(CANCELLED_STATUS);
        RunState::Cancelled
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("mode", &self.mode)
            .field("state", &self.run.state)
            .finish_non_exhaustive()
    }
}

/// Entry path as shown to the user, without leading separators.
fn display_path(path: &str) -> &str {
    path.trim_start_matches(['/', '\\'])
}

/// Format a byte count in mebibytes with two decimals.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, SyncEvent};
    use crate::transport::memory::MemoryTransport;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST_URL: &str = "http://x/fullcheck.json";
    const SHA1_123: &str = "7037807198c22a7d2b0807371d763779a84fdfcf";

    fn config(root: &TempDir) -> SyncConfig {
        SyncConfig::new(root.path()).with_fullcheck_manifest(MANIFEST_URL)
    }

    fn run(
        config: SyncConfig,
        transport: &Arc<MemoryTransport>,
        cancel: CancelFlag,
    ) -> (RunOutcome, Vec<SyncEvent>) {
        let (emitter, rx) = events::channel();
        let orchestrator = SyncOrchestrator::new(
            config,
            SyncMode::FullCheck,
            Arc::clone(transport) as Arc<dyn HttpTransport>,
            emitter,
            cancel,
        );
        let outcome = orchestrator.run();
        (outcome, events::drain(rx))
    }

    fn progress(events: &[SyncEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                SyncEvent::ProgressChanged(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn statuses(events: &[SyncEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                SyncEvent::StatusChanged(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_megabytes(1536 * 1024), "1.50 MB");
        assert_eq!(format_megabytes(3), "0.00 MB");
    }

    #[test]
    fn test_display_path_strips_leading_separators() {
        assert_eq!(display_path("/data/a.bin"), "data/a.bin");
        assert_eq!(display_path("\\data\\a.bin"), "data\\a.bin");
    }

    #[test]
    fn test_empty_manifest_succeeds() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve(MANIFEST_URL, br#"{"files":[]}"#.to_vec());

        let (outcome, events) = run(config(&temp), &transport, CancelFlag::new());

        assert!(outcome.is_success());
        assert_eq!(progress(&events), vec![100]);
        assert!(events.contains(&SyncEvent::LogMessage("No files to process.".to_string())));
        assert_eq!(events.last(), Some(&SyncEvent::RunFinished(true)));
        assert_eq!(transport.requests(), vec![MANIFEST_URL.to_string()]);
    }

    #[test]
    fn test_missing_file_is_downloaded() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve(
            MANIFEST_URL,
            format!(
                r#"{{"base_url":"http://x/","files":[{{"path":"data/a.bin","sha1":"{}","size":3}}]}}"#,
                SHA1_123
            ),
        );
        transport.serve("http://x/data/a.bin", vec![1, 2, 3]);

        let (outcome, events) = run(config(&temp), &transport, CancelFlag::new());

        assert!(outcome.is_success(), "{:?}", outcome);
        assert_eq!(outcome.downloaded_count, 1);
        assert_eq!(outcome.bytes_downloaded, 3);
        assert_eq!(fs::read(temp.path().join("data/a.bin")).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            statuses(&events),
            vec![
                "Fetching file list (fullcheck)...",
                "Verifying [1/1] data/a.bin...",
                "Downloading: data/a.bin (0.00 MB)...",
                "Verified: data/a.bin (1/1)",
            ]
        );
        assert_eq!(progress(&events), vec![100]);
    }

    #[test]
    fn test_matching_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("data")).unwrap();
        fs::write(temp.path().join("data/a.bin"), [1, 2, 3]).unwrap();

        let transport = Arc::new(MemoryTransport::new());
        transport.serve(
            MANIFEST_URL,
            format!(
                r#"{{"base_url":"http://x","files":[{{"path":"/data/a.bin","sha1":"{}"}}]}}"#,
                SHA1_123.to_uppercase()
            ),
        );

        let (outcome, _) = run(config(&temp), &transport, CancelFlag::new());

        assert!(outcome.is_success());
        assert_eq!(outcome.downloaded_count, 0);
        assert_eq!(outcome.last_processed.as_deref(), Some("data/a.bin"));
        assert_eq!(transport.requests(), vec![MANIFEST_URL.to_string()]);
    }

    #[test]
    fn test_cancel_before_start_emits_no_progress() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve(
            MANIFEST_URL,
            br#"{"base_url":"http://x","files":[{"path":"a"},{"path":"b"}]}"#.to_vec(),
        );
        let cancel = CancelFlag::new();
        cancel.cancel();

        let (outcome, events) = run(config(&temp), &transport, cancel);

        assert!(outcome.was_cancelled());
        assert!(progress(&events).is_empty());
        assert_eq!(statuses(&events).last(), Some(&CANCELLED_STATUS));
        assert_eq!(events.last(), Some(&SyncEvent::RunFinished(false)));
    }

    #[test]
    fn test_manifest_failure_fails_run() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve_status(MANIFEST_URL, 500, Vec::new());

        let (outcome, events) = run(config(&temp), &transport, CancelFlag::new());

        assert_eq!(outcome.state, RunState::Failed);
        assert!(progress(&events).is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            SyncEvent::LogMessage(text) if text.starts_with("Error: ")
        )));
        assert_eq!(events.last(), Some(&SyncEvent::RunFinished(false)));
    }

    #[test]
    fn test_unsafe_path_fails_run_without_writing() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve(
            MANIFEST_URL,
            br#"{"base_url":"http://x","files":[{"path":"../escape.bin"}]}"#.to_vec(),
        );

        let (outcome, _) = run(config(&temp), &transport, CancelFlag::new());

        assert_eq!(outcome.state, RunState::Failed);
        assert!(outcome.error.unwrap().contains("unsafe manifest path"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_missing_url_is_config_failure() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());

        let (outcome, events) = run(SyncConfig::new(temp.path()), &transport, CancelFlag::new());

        assert_eq!(outcome.state, RunState::Failed);
        assert!(transport.requests().is_empty());
        assert_eq!(events.last(), Some(&SyncEvent::RunFinished(false)));
        assert!(outcome.error.unwrap().contains("no manifest URL"));
    }
}
