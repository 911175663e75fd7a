//! INI configuration file.
//!
//! ```ini
//! [paths]
//! update_manifest = http://host/l2updater/update.json
//! fullcheck_manifest = http://host/l2updater/fullcheck.json
//! game_folder = .
//!
//! [sync]
//! manifest_timeout = 10
//! hash = sha1
//! chunk_size = 131072
//!
//! [logging]
//! directory = logs
//! level = info
//! ```
//!
//! Unknown sections and keys are ignored. Empty values fall back to the
//! defaults; an empty manifest URL means "not configured".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use thiserror::Error;
use tracing::warn;

use super::settings::SyncConfig;
use crate::integrity::HashAlgorithm;
use crate::manifest::DEFAULT_MANIFEST_TIMEOUT_SECS;
use crate::paths;
use crate::transfer::DEFAULT_CHUNK_SIZE;

/// File name of the configuration file next to the executable.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file could not be read or written.
    #[error("cannot access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid INI.
    #[error("cannot parse config file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A key has an invalid value.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The key is not a known configuration key.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsSettings {
    /// Manifest URL for update runs.
    pub update_manifest: Option<String>,
    /// Manifest URL for full-check runs.
    pub fullcheck_manifest: Option<String>,
    /// Local folder to reconcile.
    pub game_folder: PathBuf,
}

impl Default for PathsSettings {
    fn default() -> Self {
        Self {
            update_manifest: None,
            fullcheck_manifest: None,
            game_folder: PathBuf::from("."),
        }
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Manifest request timeout in seconds.
    pub manifest_timeout: u64,
    /// Hash algorithm for integrity checks.
    pub hash: HashAlgorithm,
    /// Transfer chunk size in bytes.
    pub chunk_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            manifest_timeout: DEFAULT_MANIFEST_TIMEOUT_SECS,
            hash: HashAlgorithm::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log directory, relative to the config file's directory unless
    /// absolute.
    pub directory: PathBuf,
    /// Default log level filter.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            level: "info".to_string(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathsSettings,
    pub sync: SyncSettings,
    pub logging: LoggingSettings,
}

/// Default configuration path: `config.ini` next to the running executable.
pub fn default_config_path() -> crate::error::SyncResult<PathBuf> {
    Ok(paths::application_dir()?.join(CONFIG_FILE_NAME))
}

fn write_options() -> WriteOption {
    WriteOption {
        escape_policy: EscapePolicy::Nothing,
        kv_separator: " = ",
        ..Default::default()
    }
}

impl ConfigFile {
    /// Load the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigFileError::Parse { reason, .. } => ConfigFileError::Parse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Load the file at `path`, writing the defaults first if it does not
    /// exist.
    ///
    /// Returns the configuration and whether the file was created.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool), ConfigFileError> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }

        let config = Self::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Parse INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigFileError> {
        // Backslashes are literal so Windows paths need no escaping.
        let options = ParseOption {
            enabled_escape: false,
            ..Default::default()
        };
        let ini = Ini::load_from_str_opt(content, options).map_err(|e| ConfigFileError::Parse {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        for key in super::keys::ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in super::keys::ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }

    /// Render as INI text.
    pub fn to_ini_string(&self) -> String {
        let mut out = Vec::new();
        if let Err(e) = self.to_ini().write_to_opt(&mut out, write_options()) {
            warn!(error = %e, "Failed to render configuration");
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let io_error = |source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        self.to_ini()
            .write_to_file_opt(path, write_options())
            .map_err(io_error)
    }

    /// Build the engine configuration.
    pub fn to_sync_config(&self, app_dir: &Path) -> SyncConfig {
        let mut config = SyncConfig::new(app_dir)
            .with_game_folder(self.paths.game_folder.clone())
            .with_manifest_timeout(Duration::from_secs(self.sync.manifest_timeout))
            .with_hash_algorithm(self.sync.hash)
            .with_chunk_size(self.sync.chunk_size);
        config.update_manifest_url = self.paths.update_manifest.clone();
        config.fullcheck_manifest_url = self.paths.fullcheck_manifest.clone();
        config
    }

    /// Resolve the log directory against the directory containing the config
    /// file.
    pub fn log_directory(&self, config_path: &Path) -> PathBuf {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        paths::resolve_root(&self.logging.directory, base)
    }
}
