//! `compare` command: classify blocks of two files via their inventories.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;

use blockfetch::{
    compare, BlockInventory, Classification, CompareConfig, CompareReport, DownloadEngine,
};

use crate::commands::common::{byte_progress_bar, progress_observer, UnitArg};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// First file
    pub first: PathBuf,

    /// Second file
    pub second: PathBuf,

    /// Compare head digests only
    #[arg(long)]
    pub head_only: bool,

    /// In full mode, fall back to a block's head digest when its full
    /// digest is absent
    #[arg(long)]
    pub allow_head_fallback: bool,

    /// Block size in unit multiples (used when an inventory must be built)
    #[arg(long, default_value_t = 10)]
    pub block_size: u64,

    /// Block size unit
    #[arg(long, value_enum, ignore_case = true, default_value = "mb")]
    pub unit: UnitArg,
}

fn load_or_index(args: &CompareArgs, path: &Path) -> Result<BlockInventory, CliError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let bar = byte_progress_bar(name);

    let engine = DownloadEngine::new();
    let inventory = engine.load_or_index(
        path,
        args.block_size,
        args.unit.into(),
        args.head_only,
        Some(progress_observer(bar.clone())),
    )?;
    bar.finish_and_clear();
    Ok(inventory)
}

fn print_report(args: &CompareArgs, report: &CompareReport) {
    for mismatch in &report.mismatches {
        let offset_mb = mismatch.offset / (1024 * 1024);
        println!(
            "[{:3}] {:7} MB  {}  digest mismatch",
            mismatch.index,
            offset_mb,
            Classification::Mismatch.symbol()
        );
        println!("  {}: {}", args.first.display(), mismatch.left);
        println!("  {}: {}", args.second.display(), mismatch.right);
    }
    for index in &report.indeterminate {
        println!(
            "[{:3}] {}  digest missing on one side",
            index,
            Classification::Indeterminate.symbol()
        );
    }

    println!();
    println!("Summary: {}", report.summary());
}

pub fn run(args: CompareArgs) -> Result<ExitCode, CliError> {
    let left = load_or_index(&args, &args.first)?;
    let right = load_or_index(&args, &args.second)?;

    let base = if args.head_only {
        CompareConfig::head_only()
    } else {
        CompareConfig::full()
    };
    let config = base.with_head_fallback(args.allow_head_fallback);

    let report = compare(&left, &right, config);

    println!("Comparing {} blocks", report.compared);
    print_report(&args, &report);

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
