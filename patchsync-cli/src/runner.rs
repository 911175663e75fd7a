//! Shared setup for commands that run the engine.

use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use patchsync::config::{default_config_path, ConfigFile};
use patchsync::SyncConfig;

use crate::error::CliError;
use crate::logging;

/// Resolve the config file path: `--config` or `config.ini` next to the
/// executable.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Result<PathBuf, CliError> {
    match cli_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(default_config_path()?),
    }
}

/// Loaded configuration plus initialized logging.
pub struct CliRunner {
    config_path: PathBuf,
    config: ConfigFile,
    app_dir: PathBuf,
    _log_guard: WorkerGuard,
}

impl CliRunner {
    /// Load (or create) the config file and initialize logging.
    pub fn new(cli_config: Option<&Path>, verbose: bool) -> Result<Self, CliError> {
        let config_path = resolve_config_path(cli_config)?;
        let (config, created) = ConfigFile::load_or_create(&config_path)?;

        let log_dir = config.log_directory(&config_path);
        let log_guard = logging::init_logging(&log_dir, &config.logging.level, verbose)?;

        if created {
            info!(path = %config_path.display(), "Created default configuration");
        }

        let app_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            config_path,
            config,
            app_dir,
            _log_guard: log_guard,
        })
    }

    /// Log a startup line for a command.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = patchsync::VERSION,
            command,
            config = %self.config_path.display(),
            "patchsync starting"
        );
    }

    /// The loaded configuration file.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Engine configuration derived from the config file.
    pub fn sync_config(&self) -> SyncConfig {
        self.config.to_sync_config(&self.app_dir)
    }
}
