//! Block-range planning.
//!
//! Pure arithmetic for partitioning a byte range of known size into
//! fixed-size blocks: total block count, per-block inclusive byte ranges,
//! the (possibly short) final block, and aggregate byte counts for a block
//! span. Nothing in this module performs I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors arising from invalid partitioning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Block size must be positive.
    #[error("block size must be positive, got {0}")]
    InvalidBlockSize(u64),

    /// Unit string is not one of the supported multipliers.
    #[error("unsupported unit: {0} - must be KB, MB or GB")]
    UnknownUnit(String),

    /// Block size in bytes does not fit in a u64.
    #[error("block size {block_size} {unit} overflows the byte range")]
    BlockSizeOverflow { block_size: u64, unit: SizeUnit },
}

/// Block size unit.
///
/// The only supported multipliers are binary kilo/mega/gigabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeUnit {
    Kb,
    Mb,
    Gb,
}

impl SizeUnit {
    /// Byte multiplier for this unit.
    pub fn multiplier(&self) -> u64 {
        match self {
            SizeUnit::Kb => 1024,
            SizeUnit::Mb => 1024 * 1024,
            SizeUnit::Gb => 1024 * 1024 * 1024,
        }
    }

    /// Canonical display name ("KB", "MB", "GB").
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeUnit::Kb => "KB",
            SizeUnit::Mb => "MB",
            SizeUnit::Gb => "GB",
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeUnit {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "KB" => Ok(SizeUnit::Kb),
            "MB" => Ok(SizeUnit::Mb),
            "GB" => Ok(SizeUnit::Gb),
            other => Err(PlanError::UnknownUnit(other.to_string())),
        }
    }
}

/// Deterministic partitioning of a byte range into blocks.
///
/// Ranges are inclusive on both ends. Block indices are contiguous and
/// start at 0; every block has exactly `block_size_bytes` bytes except
/// possibly the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPlan {
    total_size: u64,
    block_size_bytes: u64,
}

impl BlockPlan {
    /// Create a plan from a block size expressed in unit multiples.
    pub fn new(total_size: u64, block_size: u64, unit: SizeUnit) -> PlanResult<Self> {
        let block_size_bytes = block_size
            .checked_mul(unit.multiplier())
            .ok_or(PlanError::BlockSizeOverflow { block_size, unit })?;
        Self::from_bytes(total_size, block_size_bytes)
    }

    /// Create a plan from a block size already expressed in bytes.
    pub fn from_bytes(total_size: u64, block_size_bytes: u64) -> PlanResult<Self> {
        if block_size_bytes == 0 {
            return Err(PlanError::InvalidBlockSize(block_size_bytes));
        }
        Ok(Self {
            total_size,
            block_size_bytes,
        })
    }

    /// Total size of the partitioned range in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Block size in bytes.
    pub fn block_size_bytes(&self) -> u64 {
        self.block_size_bytes
    }

    /// Number of blocks (ceiling division; 0 for an empty range).
    pub fn total_blocks(&self) -> u64 {
        if self.total_size == 0 {
            0
        } else {
            (self.total_size + self.block_size_bytes - 1) / self.block_size_bytes
        }
    }

    /// Size of the final block in bytes (0 for an empty range).
    pub fn last_block_size(&self) -> u64 {
        let total_blocks = self.total_blocks();
        if total_blocks == 0 {
            0
        } else {
            self.total_size - (total_blocks - 1) * self.block_size_bytes
        }
    }

    /// Inclusive byte range `(start, end)` of the block at `index`.
    ///
    /// `index` must be less than `total_blocks()`.
    pub fn block_range(&self, index: u64) -> (u64, u64) {
        let start = index * self.block_size_bytes;
        let end = (start + self.block_size_bytes - 1).min(self.total_size - 1);
        (start, end)
    }

    /// Clamp a requested last-block index to the final block.
    ///
    /// `None` selects the final block. Out-of-range indices are clamped,
    /// never rejected.
    pub fn clamp_to_block(&self, to_block: Option<u64>) -> u64 {
        let last = self.total_blocks().saturating_sub(1);
        to_block.unwrap_or(last).min(last)
    }

    /// Enumerate `(index, start, end)` for blocks in `[from_block, to_block]`,
    /// ascending. Empty when the range selects no blocks.
    pub fn ranges(&self, from_block: u64, to_block: u64) -> Vec<(u64, u64, u64)> {
        let total_blocks = self.total_blocks();
        if total_blocks == 0 || from_block >= total_blocks {
            return Vec::new();
        }
        let to_block = to_block.min(total_blocks - 1);
        (from_block..=to_block)
            .map(|index| {
                let (start, end) = self.block_range(index);
                (index, start, end)
            })
            .collect()
    }

    /// Total bytes covered by the blocks in `[from_block, to_block]`.
    pub fn range_bytes(&self, from_block: u64, to_block: u64) -> u64 {
        self.ranges(from_block, to_block)
            .iter()
            .map(|(_, start, end)| end - start + 1)
            .sum()
    }
}

/// Format a byte count in the given unit, e.g. `"10.00 MB"`.
pub fn format_size(size_bytes: u64, unit: SizeUnit, decimals: usize) -> String {
    let value = size_bytes as f64 / unit.multiplier() as f64;
    format!("{:.*} {}", decimals, value, unit)
}
