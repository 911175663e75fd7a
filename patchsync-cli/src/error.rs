//! CLI error type.

use std::fmt;
use std::io;
use std::process::ExitCode;

use patchsync::config::ConfigFileError;
use patchsync::SyncError;

/// Exit code for a run stopped with Ctrl+C.
pub const EXIT_CANCELLED: u8 = 130;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid arguments or configuration.
    Config(String),
    /// Engine failure before or while starting a run.
    Sync(SyncError),
    /// Terminal I/O failure.
    Io(io::Error),
    /// The run finished unsuccessfully.
    RunFailed(String),
    /// The run was cancelled.
    Cancelled,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Cancelled => ExitCode::from(EXIT_CANCELLED),
            _ => ExitCode::FAILURE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Sync(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::RunFailed(msg) => write!(f, "Sync failed: {}", msg),
            CliError::Cancelled => write!(f, "Update cancelled."),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Sync(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        CliError::Sync(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
