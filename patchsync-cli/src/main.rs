//! patchsync CLI - Command-line interface
//!
//! Runs update and full-check syncs against the configured manifests,
//! manages the configuration file, and generates manifests for servers.

mod commands;
mod error;
mod logging;
mod runner;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use console::style;
use patchsync::SyncMode;

use commands::config::ConfigCommands;
use commands::manifest::ManifestCommands;
use commands::sync::SyncArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "patchsync")]
#[command(about = "Keep a local client directory in sync with a remote manifest")]
#[command(long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file [default: config.ini next to the executable]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the incremental update manifest
    Update(RunArgs),

    /// Verify every file against the full-check manifest
    #[command(alias = "full-check")]
    Fullcheck(RunArgs),

    /// Write the default configuration file if missing
    Init,

    /// View or modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Server-side manifest tools
    Manifest {
        #[command(subcommand)]
        command: ManifestCommands,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Local folder to synchronize (overrides paths.game_folder)
    #[arg(long)]
    game_folder: Option<PathBuf>,

    /// Manifest URL (overrides the configured URL for this mode)
    #[arg(long)]
    manifest_url: Option<String>,

    /// Suppress the progress bar and summary
    #[arg(short, long)]
    quiet: bool,
}

impl From<RunArgs> for SyncArgs {
    fn from(args: RunArgs) -> Self {
        SyncArgs {
            game_folder: args.game_folder,
            manifest_url: args.manifest_url,
            quiet: args.quiet,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Update(args) => {
            commands::sync::run(SyncMode::Update, args.into(), config, cli.verbose)
        }
        Commands::Fullcheck(args) => {
            commands::sync::run(SyncMode::FullCheck, args.into(), config, cli.verbose)
        }
        Commands::Init => commands::init::run(config),
        Commands::Config { command } => commands::config::run(command, config),
        Commands::Manifest { command } => {
            logging::init_stderr_logging(cli.verbose);
            commands::manifest::run(command)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(error: CliError) -> ExitCode {
    match &error {
        CliError::Cancelled => eprintln!("{}", style(&error).yellow()),
        _ => eprintln!("{} {}", style("Error:").red().bold(), error),
    }
    error.exit_code()
}
