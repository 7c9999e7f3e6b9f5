//! `create` command: write a block inventory sidecar for a local file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;

use blockfetch::{metadata_path, DownloadEngine};

use crate::commands::common::{byte_progress_bar, progress_observer, UnitArg};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// File to index
    pub file: PathBuf,

    /// Block size in unit multiples
    #[arg(long, default_value_t = 10)]
    pub block_size: u64,

    /// Block size unit
    #[arg(long, value_enum, ignore_case = true, default_value = "mb")]
    pub unit: UnitArg,

    /// Compute head digests only (one chunk per block)
    #[arg(long)]
    pub head_only: bool,
}

pub fn run(args: CreateArgs) -> Result<ExitCode, CliError> {
    let meta_path = metadata_path(&args.file);
    if meta_path.exists() {
        println!("{} already exists", meta_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let bar = byte_progress_bar(name);

    let engine = DownloadEngine::new();
    let inventory = engine.load_or_index(
        &args.file,
        args.block_size,
        args.unit.into(),
        args.head_only,
        Some(progress_observer(bar.clone())),
    )?;
    bar.finish_and_clear();

    println!(
        "Wrote {} with {} blocks",
        meta_path.display(),
        inventory.blocks.len()
    );
    Ok(ExitCode::SUCCESS)
}
