//! Named configuration keys for `config get/set/list`.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{ConfigFile, ConfigFileError};
use crate::integrity::HashAlgorithm;

/// A `section.key` entry of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    PathsUpdateManifest,
    PathsFullcheckManifest,
    PathsGameFolder,
    SyncManifestTimeout,
    SyncHash,
    SyncChunkSize,
    LoggingDirectory,
    LoggingLevel,
}

const ALL_KEYS: [ConfigKey; 8] = [
    ConfigKey::PathsUpdateManifest,
    ConfigKey::PathsFullcheckManifest,
    ConfigKey::PathsGameFolder,
    ConfigKey::SyncManifestTimeout,
    ConfigKey::SyncHash,
    ConfigKey::SyncChunkSize,
    ConfigKey::LoggingDirectory,
    ConfigKey::LoggingLevel,
];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl ConfigKey {
    /// All keys, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        match self {
            Self::PathsUpdateManifest | Self::PathsFullcheckManifest | Self::PathsGameFolder => {
                "paths"
            }
            Self::SyncManifestTimeout | Self::SyncHash | Self::SyncChunkSize => "sync",
            Self::LoggingDirectory | Self::LoggingLevel => "logging",
        }
    }

    /// Key name within the section.
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::PathsUpdateManifest => "update_manifest",
            Self::PathsFullcheckManifest => "fullcheck_manifest",
            Self::PathsGameFolder => "game_folder",
            Self::SyncManifestTimeout => "manifest_timeout",
            Self::SyncHash => "hash",
            Self::SyncChunkSize => "chunk_size",
            Self::LoggingDirectory => "directory",
            Self::LoggingLevel => "level",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text. Unset values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::PathsUpdateManifest => config.paths.update_manifest.clone().unwrap_or_default(),
            Self::PathsFullcheckManifest => {
                config.paths.fullcheck_manifest.clone().unwrap_or_default()
            }
            Self::PathsGameFolder => config.paths.game_folder.display().to_string(),
            Self::SyncManifestTimeout => config.sync.manifest_timeout.to_string(),
            Self::SyncHash => config.sync.hash.to_string(),
            Self::SyncChunkSize => config.sync.chunk_size.to_string(),
            Self::LoggingDirectory => config.logging.directory.display().to_string(),
            Self::LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Set a value from text. An empty value restores the default.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigFileError> {
        let value = value.trim();
        let defaults = ConfigFile::default();
        let invalid = |reason: String| ConfigFileError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason,
        };

        match self {
            Self::PathsUpdateManifest => config.paths.update_manifest = non_empty(value),
            Self::PathsFullcheckManifest => config.paths.fullcheck_manifest = non_empty(value),
            Self::PathsGameFolder => {
                config.paths.game_folder = if value.is_empty() {
                    defaults.paths.game_folder
                } else {
                    PathBuf::from(value)
                }
            }
            Self::SyncManifestTimeout => {
                config.sync.manifest_timeout = if value.is_empty() {
                    defaults.sync.manifest_timeout
                } else {
                    match value.parse::<u64>() {
                        Ok(0) => return Err(invalid("must be at least 1 second".to_string())),
                        Ok(secs) => secs,
                        Err(e) => return Err(invalid(e.to_string())),
                    }
                }
            }
            Self::SyncHash => {
                config.sync.hash = if value.is_empty() {
                    defaults.sync.hash
                } else {
                    HashAlgorithm::from_str(value).map_err(invalid)?
                }
            }
            Self::SyncChunkSize => {
                config.sync.chunk_size = if value.is_empty() {
                    defaults.sync.chunk_size
                } else {
                    match value.parse::<usize>() {
                        Ok(0) => return Err(invalid("must be at least 1 byte".to_string())),
                        Ok(size) => size,
                        Err(e) => return Err(invalid(e.to_string())),
                    }
                }
            }
            Self::LoggingDirectory => {
                config.logging.directory = if value.is_empty() {
                    defaults.logging.directory
                } else {
                    PathBuf::from(value)
                }
            }
            Self::LoggingLevel => {
                let level = value.to_ascii_lowercase();
                config.logging.level = if level.is_empty() {
                    defaults.logging.level
                } else if LOG_LEVELS.contains(&level.as_str()) {
                    level
                } else {
                    return Err(invalid(format!("expected one of {}", LOG_LEVELS.join(", "))));
                }
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigFileError::UnknownKey(s.to_string()))
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert_eq!(
            "paths.update_manifest".parse::<ConfigKey>().unwrap(),
            ConfigKey::PathsUpdateManifest
        );
        assert_eq!(
            "SYNC.HASH".parse::<ConfigKey>().unwrap(),
            ConfigKey::SyncHash
        );
        assert!(matches!(
            "paths.exe".parse::<ConfigKey>(),
            Err(ConfigFileError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_every_key_round_trips_its_default() {
        let defaults = ConfigFile::default();
        for key in ConfigKey::all() {
            let mut config = ConfigFile::default();
            key.set(&mut config, &key.get(&defaults)).unwrap();
            assert_eq!(config, defaults, "{}", key.name());
        }
    }

    #[test]
    fn test_set_and_clear_manifest_url() {
        let mut config = ConfigFile::default();
        let key = ConfigKey::PathsFullcheckManifest;

        key.set(&mut config, " http://host/fullcheck.json ").unwrap();
        assert_eq!(key.get(&config), "http://host/fullcheck.json");

        key.set(&mut config, "").unwrap();
        assert!(config.paths.fullcheck_manifest.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::SyncManifestTimeout.set(&mut config, "0").is_err());
        assert!(ConfigKey::SyncChunkSize.set(&mut config, "-1").is_err());
        assert!(ConfigKey::SyncHash.set(&mut config, "md5").is_err());
        assert!(ConfigKey::LoggingLevel.set(&mut config, "loud").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
