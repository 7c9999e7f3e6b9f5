//! BlockFetch CLI - block-range download and verification tool.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

#[derive(Debug, Parser)]
#[command(
    name = "blockfetch",
    version,
    about = "Download and verify large files block by block"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a block inventory sidecar for a local file
    Create(commands::create::CreateArgs),
    /// Compare two files block by block via their inventories
    Compare(commands::compare::CompareArgs),
    /// Download a remote file in blocks using HTTP range requests
    Download(commands::download::DownloadArgs),
    /// Recompute digests from block content and check them against an inventory
    Verify(commands::verify::VerifyArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Create(args) => commands::create::run(args),
        Commands::Compare(args) => commands::compare::run(args),
        Commands::Download(args) => commands::download::run(args),
        Commands::Verify(args) => commands::verify::run(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
