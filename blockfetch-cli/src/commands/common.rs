//! Common argument types and progress-bar wiring shared across commands.

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};

use blockfetch::{ProgressCallback, SizeUnit};

/// Block size unit selection for CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum UnitArg {
    /// 1024 bytes
    Kb,
    /// 1024² bytes
    Mb,
    /// 1024³ bytes
    Gb,
}

impl From<UnitArg> for SizeUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Kb => SizeUnit::Kb,
            UnitArg::Mb => SizeUnit::Mb,
            UnitArg::Gb => SizeUnit::Gb,
        }
    }
}

/// Byte-level progress bar in the standard download style.
pub fn byte_progress_bar(message: String) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .expect("progress template is valid")
        .progress_chars("=>-"),
    );
    bar.set_message(message);
    bar
}

/// Adapt a progress bar to the engine's byte-level observer callback.
///
/// The bar length is set lazily from the first report, so callers do not
/// need to know the total before the engine resolves it.
pub fn progress_observer(bar: ProgressBar) -> ProgressCallback {
    Box::new(move |done, total| {
        if bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar.set_position(done);
    })
}
