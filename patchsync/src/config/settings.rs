//! Run configuration handed to the engine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{SyncError, SyncResult};
use crate::integrity::HashAlgorithm;
use crate::manifest::DEFAULT_MANIFEST_TIMEOUT_SECS;
use crate::paths;
use crate::transfer::DEFAULT_CHUNK_SIZE;

/// Which manifest a run reconciles against.
///
/// Both modes run the identical pipeline; only the manifest URL differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Incremental update manifest.
    Update,
    /// Manifest listing every file of the installation.
    FullCheck,
}

impl SyncMode {
    /// Short name used in messages and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::FullCheck => "fullcheck",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "update" => Ok(Self::Update),
            "fullcheck" | "full-check" | "full_check" => Ok(Self::FullCheck),
            other => Err(format!(
                "unknown sync mode '{}' (expected update or fullcheck)",
                other
            )),
        }
    }
}

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Manifest URL used in [`SyncMode::Update`].
    pub update_manifest_url: Option<String>,

    /// Manifest URL used in [`SyncMode::FullCheck`].
    pub fullcheck_manifest_url: Option<String>,

    /// Local folder to reconcile. Relative paths are resolved against
    /// `app_dir`.
    pub game_folder: PathBuf,

    /// Directory containing the running application.
    pub app_dir: PathBuf,

    /// Timeout for the manifest request.
    pub manifest_timeout: Duration,

    /// Content hash algorithm for integrity checks.
    pub hash_algorithm: HashAlgorithm,

    /// Chunk size for file transfers.
    pub chunk_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            update_manifest_url: None,
            fullcheck_manifest_url: None,
            game_folder: PathBuf::from("."),
            app_dir: PathBuf::from("."),
            manifest_timeout: Duration::from_secs(DEFAULT_MANIFEST_TIMEOUT_SECS),
            hash_algorithm: HashAlgorithm::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SyncConfig {
    /// Create a configuration for the given application directory.
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            ..Default::default()
        }
    }

    /// Set the update manifest URL.
    pub fn with_update_manifest(mut self, url: impl Into<String>) -> Self {
        self.update_manifest_url = Some(url.into());
        self
    }

    /// Set the full-check manifest URL.
    pub fn with_fullcheck_manifest(mut self, url: impl Into<String>) -> Self {
        self.fullcheck_manifest_url = Some(url.into());
        self
    }

    /// Set the manifest URL for a specific mode.
    pub fn with_manifest_for(self, mode: SyncMode, url: impl Into<String>) -> Self {
        match mode {
            SyncMode::Update => self.with_update_manifest(url),
            SyncMode::FullCheck => self.with_fullcheck_manifest(url),
        }
    }

    /// Set the local folder.
    pub fn with_game_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.game_folder = folder.into();
        self
    }

    /// Set the manifest timeout.
    pub fn with_manifest_timeout(mut self, timeout: Duration) -> Self {
        self.manifest_timeout = timeout;
        self
    }

    /// Set the hash algorithm.
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Set the transfer chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Resolve the manifest URL for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when the URL is unset or blank.
    pub fn manifest_url(&self, mode: SyncMode) -> SyncResult<&str> {
        let url = match mode {
            SyncMode::Update => self.update_manifest_url.as_deref(),
            SyncMode::FullCheck => self.fullcheck_manifest_url.as_deref(),
        };

        url.map(str::trim).filter(|u| !u.is_empty()).ok_or_else(|| {
            SyncError::Config(format!("no manifest URL configured for {} mode", mode))
        })
    }

    /// The local root this configuration resolves to.
    pub fn local_root(&self) -> PathBuf {
        paths::resolve_root(&self.game_folder, &self.app_dir)
    }

    /// Directory containing the running application.
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.game_folder, PathBuf::from("."));
        assert_eq!(config.manifest_timeout, Duration::from_secs(10));
        assert_eq!(config.chunk_size, 128 * 1024);
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha1);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SyncConfig::new("/opt/launcher")
            .with_update_manifest("http://x/update.json")
            .with_fullcheck_manifest("http://x/fullcheck.json")
            .with_game_folder("client")
            .with_manifest_timeout(Duration::from_secs(3))
            .with_chunk_size(0);

        assert_eq!(
            config.manifest_url(SyncMode::Update).unwrap(),
            "http://x/update.json"
        );
        assert_eq!(
            config.manifest_url(SyncMode::FullCheck).unwrap(),
            "http://x/fullcheck.json"
        );
        assert_eq!(config.local_root(), PathBuf::from("/opt/launcher/client"));
        assert_eq!(config.chunk_size, 1);
    }

    #[test]
    fn test_missing_manifest_url_is_config_error() {
        let config = SyncConfig::default().with_update_manifest("   ");

        let err = config.manifest_url(SyncMode::Update).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(config.manifest_url(SyncMode::FullCheck).is_err());
    }

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("update".parse::<SyncMode>(), Ok(SyncMode::Update));
        assert_eq!("Full-Check".parse::<SyncMode>(), Ok(SyncMode::FullCheck));
        assert!("repair".parse::<SyncMode>().is_err());
        assert_eq!(SyncMode::FullCheck.to_string(), "fullcheck");
    }
}
