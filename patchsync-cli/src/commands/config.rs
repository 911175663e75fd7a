//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path`
//! for viewing and modifying the INI file from the command line.

use std::path::Path;

use clap::Subcommand;
use patchsync::config::{ConfigFile, ConfigKey};

use crate::error::CliError;
use crate::runner::resolve_config_path;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., paths.update_manifest)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., paths.update_manifest)
        key: String,

        /// Value to set (empty restores the default)
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path)?;
    match command {
        ConfigCommands::Get { key } => run_get(&path, &key),
        ConfigCommands::Set { key, value } => run_set(&path, &key, &value),
        ConfigCommands::List => run_list(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'patchsync config list' to see available keys.",
            key
        ))
    })
}

fn load(path: &Path) -> Result<ConfigFile, CliError> {
    if path.exists() {
        Ok(ConfigFile::load(path)?)
    } else {
        Ok(ConfigFile::default())
    }
}

fn run_get(path: &Path, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let value = config_key.get(&load(path)?);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

fn run_set(path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = load(path)?;
    config_key.set(&mut config, value)?;
    config.save(path)?;

    println!("Set {} = {}", config_key.name(), config_key.get(&config));

    Ok(())
}

fn run_list(path: &Path) -> Result<(), CliError> {
    let config = load(path)?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }

    Ok(())
}
