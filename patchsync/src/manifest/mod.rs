//! Manifest model and client.
//!
//! A manifest is the remote-published declarative list of files a local
//! directory should contain:
//!
//! ```json
//! {
//!   "base_url": "http://host/client",
//!   "files": [
//!     { "path": "system/l2.ini", "sha1": "…", "size": 1024 }
//!   ]
//! }
//! ```

mod client;
mod types;

pub use client::{ManifestClient, DEFAULT_MANIFEST_TIMEOUT_SECS};
pub use types::{FileEntry, Manifest};
