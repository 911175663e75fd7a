//! patchsync - manifest-driven file synchronization
//!
//! Reconciles a local directory tree against a remote JSON manifest. Each
//! listed file is hash-checked; missing or changed files are downloaded.
//! Runs execute on a background worker and report progress, status, and log
//! lines through an event channel that any front end can observe.
//!
//! # Architecture
//!
//! ```text
//! SyncEngine::start(mode)
//!   └── worker thread: SyncOrchestrator
//!         ├── ManifestClient   fetch + parse manifest
//!         ├── paths            resolve root and entry paths
//!         ├── integrity        hash local files
//!         └── Downloader       stream files to disk
//!   └── EventEmitter ──► channel ──► SyncObserver(s)
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod events;
pub mod integrity;
pub mod manifest;
pub mod paths;
pub mod publisher;
pub mod sync;
pub mod transfer;
pub mod transport;

pub use cancel::CancelFlag;
pub use config::{SyncConfig, SyncMode};
pub use error::{ErrorKind, SyncError, SyncResult};
pub use events::{SyncEvent, SyncObserver};
pub use sync::{RunHandle, RunOutcome, RunState, SyncEngine};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
