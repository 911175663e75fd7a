//! Update and full-check commands.

use std::path::{Path, PathBuf};

use console::style;
use tracing::warn;

use patchsync::events::ObserverSet;
use patchsync::{RunOutcome, SyncEngine, SyncMode};

use crate::error::CliError;
use crate::runner::CliRunner;
use crate::ui::{format_size, LogObserver, ProgressObserver};

/// Arguments shared by `update` and `fullcheck`.
pub struct SyncArgs {
    pub game_folder: Option<PathBuf>,
    pub manifest_url: Option<String>,
    pub quiet: bool,
}

/// Run a sync in `mode`.
pub fn run(
    mode: SyncMode,
    args: SyncArgs,
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path, verbose)?;
    runner.log_startup(mode.name());

    let mut config = runner.sync_config();
    if let Some(folder) = args.game_folder {
        config = config.with_game_folder(folder);
    }
    if let Some(url) = args.manifest_url {
        config = config.with_manifest_for(mode, url);
    }

    if !args.quiet {
        println!("patchsync v{} - {}", patchsync::VERSION, mode);
        println!("Game folder: {}", config.local_root().display());
        println!("Hash:        {}", runner.config().sync.hash);
        println!();
    }

    let engine = SyncEngine::new(config)?;
    let mut handle = engine.start(mode)?;

    let cancel = handle.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        handle.cancel();
        if let Err(wait_error) = handle.wait() {
            warn!(error = %wait_error, "Sync worker did not shut down cleanly");
        }
        return Err(CliError::Config(format!("Failed to set signal handler: {}", e)));
    }

    let observers = ObserverSet::new().with(LogObserver);
    let observers = if args.quiet {
        observers
    } else {
        observers.with(ProgressObserver::new())
    };
    handle.subscribe(observers)?;

    let outcome = handle.wait()?;
    if !args.quiet {
        print_summary(&outcome);
    }

    if outcome.was_cancelled() {
        warn!("Run cancelled by user");
        Err(CliError::Cancelled)
    } else if outcome.is_success() {
        Ok(())
    } else {
        Err(CliError::RunFailed(
            outcome.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

fn print_summary(outcome: &RunOutcome) {
    println!();
    println!("Run Summary");
    println!("───────────");
    println!(
        "  Files checked:    {}/{}",
        outcome.completed_count, outcome.total_entries
    );
    println!(
        "  Files downloaded: {} ({})",
        outcome.downloaded_count,
        format_size(outcome.bytes_downloaded)
    );
    if outcome.is_success() {
        println!("  Result:           {}", style("up to date").green());
    } else if outcome.was_cancelled() {
        println!("  Result:           {}", style("cancelled").yellow());
    } else {
        println!("  Result:           {}", style("failed").red());
    }
}
