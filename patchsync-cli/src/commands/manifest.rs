//! Manifest generation for servers publishing a client directory.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use patchsync::publisher::{ManifestGenerator, DEFAULT_UPDATE_PREFIX};

use crate::error::CliError;

/// Manifest subcommands.
#[derive(Debug, Subcommand)]
pub enum ManifestCommands {
    /// Generate fullcheck.json and update.json from a client directory
    Generate {
        /// Client directory to publish
        client_dir: PathBuf,

        /// URL the client directory is served under
        #[arg(long)]
        base_url: String,

        /// Directory to write the manifests to [default: parent of the client directory]
        #[arg(long)]
        output: Option<PathBuf>,

        /// Path prefix of files included in update.json
        #[arg(long, default_value = DEFAULT_UPDATE_PREFIX)]
        update_prefix: String,
    },
}

/// Run a manifest subcommand.
pub fn run(command: ManifestCommands) -> Result<(), CliError> {
    match command {
        ManifestCommands::Generate {
            client_dir,
            base_url,
            output,
            update_prefix,
        } => generate(&client_dir, &base_url, output, &update_prefix),
    }
}

fn generate(
    client_dir: &Path,
    base_url: &str,
    output: Option<PathBuf>,
    update_prefix: &str,
) -> Result<(), CliError> {
    if base_url.trim().is_empty() {
        return Err(CliError::Config("--base-url must not be empty".to_string()));
    }

    let output = output.unwrap_or_else(|| {
        client_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let manifests = ManifestGenerator::new(base_url)
        .with_update_prefix(update_prefix)
        .scan(client_dir)?;
    let written = manifests.write(&output)?;

    println!(
        "Generated manifests ({} files, {} in update):",
        manifests.fullcheck.len(),
        manifests.update.len()
    );
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}
