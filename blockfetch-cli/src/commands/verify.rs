//! `verify` command: recompute digests from block content on disk and
//! check them against a stored inventory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;

use blockfetch::inventory::METADATA_SUFFIX;
use blockfetch::{metadata_path, BlockInventory, Classification, DownloadEngine};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Inventory sidecar, or the file it describes
    pub inventory: PathBuf,

    /// Directory holding the block content (defaults to the sidecar's
    /// directory)
    pub dir: Option<PathBuf>,
}

pub fn run(args: VerifyArgs) -> Result<ExitCode, CliError> {
    let meta_path = if args
        .inventory
        .file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(METADATA_SUFFIX))
    {
        args.inventory.clone()
    } else {
        metadata_path(&args.inventory)
    };

    let inventory = BlockInventory::load(&meta_path)?;
    let dir = args.dir.unwrap_or_else(|| {
        meta_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf()
    });

    let engine = DownloadEngine::new();
    let report = engine.verify_parts(&inventory, &dir);

    println!(
        "Verified {} blocks against {}",
        report.compared,
        meta_path.display()
    );
    for mismatch in &report.mismatches {
        println!(
            "[{:3}] {}  stored {} recomputed {}",
            mismatch.index,
            Classification::Mismatch.symbol(),
            mismatch.left,
            mismatch.right
        );
    }
    for index in &report.indeterminate {
        println!(
            "[{:3}] {}  content unreadable",
            index,
            Classification::Indeterminate.symbol()
        );
    }

    println!();
    println!("Summary: {}", report.summary());

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
