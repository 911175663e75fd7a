//! Sync runs: per-run orchestration and background execution.
//!
//! # Example
//!
//! ```no_run
//! use patchsync::config::{SyncConfig, SyncMode};
//! use patchsync::events::Callbacks;
//! use patchsync::sync::SyncEngine;
//!
//! let config = SyncConfig::new(".")
//!     .with_update_manifest("http://host/l2updater/update.json");
//! let engine = SyncEngine::new(config)?;
//!
//! let mut handle = engine.start(SyncMode::Update)?;
//! handle.subscribe(Callbacks::new().on_status(|text| println!("{}", text)))?;
//!
//! let outcome = handle.wait()?;
//! println!("downloaded {} files", outcome.downloaded_count);
//! # Ok::<(), patchsync::SyncError>(())
//! ```

mod engine;
mod orchestrator;
mod state;

pub use engine::{RunHandle, SyncEngine};
pub use orchestrator::{format_megabytes, SyncOrchestrator, CANCELLED_STATUS};
pub use state::{progress_percent, RunOutcome, RunState, SyncRun};
