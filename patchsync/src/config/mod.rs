//! Configuration for sync runs and the on-disk configuration file.

mod file;
mod keys;
mod settings;

pub use file::{
    default_config_path, ConfigFile, ConfigFileError, LoggingSettings, PathsSettings,
    SyncSettings, CONFIG_FILE_NAME,
};
pub use keys::ConfigKey;
pub use settings::{SyncConfig, SyncMode};
