//! Manifest fetching over HTTP.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::types::Manifest;
use crate::error::{SyncError, SyncResult};
use crate::transport::{HttpTransport, TransportError};

/// Default timeout for the manifest request in seconds.
pub const DEFAULT_MANIFEST_TIMEOUT_SECS: u64 = 10;

/// Fetches and parses manifests.
///
/// A single attempt is made per fetch; there is no retry.
#[derive(Clone)]
pub struct ManifestClient {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl ManifestClient {
    /// Create a client with the default timeout.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_timeout(transport, Duration::from_secs(DEFAULT_MANIFEST_TIMEOUT_SECS))
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// The timeout applied to each fetch.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch and parse the manifest at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Timeout`] when the request exceeds the timeout and
    /// [`SyncError::Manifest`] for any other transport failure, a non-success
    /// status, or a body that is not a manifest document.
    pub fn fetch(&self, url: &str) -> SyncResult<Manifest> {
        let manifest_error = |reason: String| SyncError::Manifest {
            url: url.to_string(),
            reason,
        };
        let timeout_error = || SyncError::Timeout {
            url: url.to_string(),
            timeout_secs: self.timeout.as_secs(),
        };

        let mut response = self
            .transport
            .get(url, Some(self.timeout))
            .map_err(|e| match e {
                TransportError::Timeout => timeout_error(),
                other => manifest_error(other.to_string()),
            })?;

        if !response.is_success() {
            return Err(manifest_error(format!(
                "GET request failed with status {}",
                response.status
            )));
        }

        let mut body = Vec::new();
        response.body.read_to_end(&mut body).map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                timeout_error()
            } else {
                manifest_error(format!("read error: {}", e))
            }
        })?;

        let manifest = Manifest::from_slice(&body).map_err(manifest_error)?;
        debug!(url, entries = manifest.len(), "Manifest fetched");
        Ok(manifest)
    }
}

impl std::fmt::Debug for ManifestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
