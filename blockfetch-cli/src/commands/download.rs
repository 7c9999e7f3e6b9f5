//! `download` command: fetch a remote file block by block with HTTP range
//! requests, persisting the inventory after every block.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use tracing::info;

use blockfetch::{
    format_size, metadata_path, BlockInventory, DownloadEngine, EngineConfig, HttpSource,
};

use crate::commands::common::{byte_progress_bar, progress_observer, UnitArg};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Source URL
    pub url: String,

    /// Directory for part files and the inventory sidecar
    pub target: PathBuf,

    /// First block index to fetch
    #[arg(long, default_value_t = 0)]
    pub from_block: u64,

    /// Last block index to fetch (inclusive, clamped; defaults to the end)
    #[arg(long)]
    pub to_block: Option<u64>,

    /// Block size in unit multiples
    #[arg(long, default_value_t = 10)]
    pub block_size: u64,

    /// Block size unit
    #[arg(long, value_enum, ignore_case = true, default_value = "mb")]
    pub unit: UnitArg,

    /// Number of blocks fetched concurrently
    #[arg(long, default_value_t = 1)]
    pub parallel: usize,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,
}

/// Last path segment of a URL, used to name the inventory sidecar.
fn remote_file_name(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("download")
}

pub fn run(args: DownloadArgs) -> Result<ExitCode, CliError> {
    let config = EngineConfig::default()
        .with_parallel_fetches(args.parallel)
        .with_timeout(Duration::from_secs(args.timeout));
    let engine = DownloadEngine::with_config(config);

    let source = HttpSource::with_timeout(args.url.as_str(), engine.config().timeout)?;

    let name = remote_file_name(&args.url);
    let meta_path = metadata_path(&args.target.join(name));

    let mut inventory = if meta_path.exists() {
        info!(meta = %meta_path.display(), "resuming from existing inventory");
        BlockInventory::load(&meta_path)?
    } else {
        BlockInventory::new(args.url.as_str(), args.block_size, args.unit.into())
    };

    let bar = byte_progress_bar(name.to_string());
    engine.run(
        &source,
        &args.target,
        &meta_path,
        &mut inventory,
        args.from_block,
        args.to_block,
        Some(progress_observer(bar.clone())),
    )?;
    bar.finish_and_clear();

    let fetched_bytes: u64 = inventory.blocks.iter().map(|b| b.size).sum();
    println!(
        "Fetched {} blocks ({}) from {}",
        inventory.blocks.len(),
        format_size(fetched_bytes, inventory.unit, 2),
        args.url
    );
    println!("Inventory: {}", meta_path.display());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_name() {
        assert_eq!(
            remote_file_name("https://example.com/blazegraph/data.jnl"),
            "data.jnl"
        );
        assert_eq!(remote_file_name("https://example.com/data.jnl/"), "data.jnl");
        assert_eq!(remote_file_name(""), "download");
    }
}
