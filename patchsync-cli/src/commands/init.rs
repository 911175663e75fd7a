//! Init command - write the default configuration file.

use std::path::Path;

use patchsync::config::ConfigFile;

use crate::error::CliError;
use crate::runner::resolve_config_path;

/// Run the init command.
pub fn run(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path)?;
    let (config, created) = ConfigFile::load_or_create(&path)?;

    if created {
        println!("Created configuration file: {}", path.display());
    } else {
        println!("Configuration file: {}", path.display());
    }
    println!();

    if config.paths.update_manifest.is_none() || config.paths.fullcheck_manifest.is_none() {
        println!("Set the manifest URLs before running an update:");
        println!("  patchsync config set paths.update_manifest <url>");
        println!("  patchsync config set paths.fullcheck_manifest <url>");
    } else {
        println!("Run 'patchsync update' or 'patchsync fullcheck' to synchronize.");
    }
    Ok(())
}
