//! CLI error types.

use std::fmt;

use blockfetch::{EngineError, InventoryError, PlanError, SourceError};

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Engine operation failed.
    Engine(EngineError),

    /// Inventory sidecar could not be read or written.
    Inventory(InventoryError),

    /// Invalid partitioning configuration.
    Plan(PlanError),

    /// Source could not be opened or read.
    Source(SourceError),

    /// Invalid command-line usage.
    Usage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Engine(e) => write!(f, "{}", e),
            CliError::Inventory(e) => write!(f, "{}", e),
            CliError::Plan(e) => write!(f, "{}", e),
            CliError::Source(e) => write!(f, "{}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Engine(e) => Some(e),
            CliError::Inventory(e) => Some(e),
            CliError::Plan(e) => Some(e),
            CliError::Source(e) => Some(e),
            CliError::Usage(_) => None,
        }
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}

impl From<InventoryError> for CliError {
    fn from(e: InventoryError) -> Self {
        CliError::Inventory(e)
    }
}

impl From<PlanError> for CliError {
    fn from(e: PlanError) -> Self {
        CliError::Plan(e)
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Source(e)
    }
}
