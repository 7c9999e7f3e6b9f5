//! Block-wise inventory comparison.
//!
//! Compares two inventories over the intersection of their block indices
//! and classifies every common block as [`Classification::Match`],
//! [`Classification::Mismatch`] or [`Classification::Indeterminate`].
//! Comparison never fails and never mutates its inputs; missing digests
//! degrade to the indeterminate classification instead of erroring.

use std::collections::BTreeMap;
use std::fmt;

use crate::inventory::{Block, BlockInventory};

/// Which digest field to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Compare head digests only.
    HeadOnly,
    /// Compare full digests.
    Full,
}

/// Comparison configuration.
#[derive(Debug, Clone, Copy)]
pub struct CompareConfig {
    pub mode: CompareMode,
    /// In `Full` mode, substitute a side's head digest when its full digest
    /// is absent. Off by default; the substitution happens per side, so two
    /// head-only records compare head against head.
    pub allow_head_fallback: bool,
}

impl CompareConfig {
    pub fn full() -> Self {
        Self {
            mode: CompareMode::Full,
            allow_head_fallback: false,
        }
    }

    pub fn head_only() -> Self {
        Self {
            mode: CompareMode::HeadOnly,
            allow_head_fallback: false,
        }
    }

    pub fn with_head_fallback(mut self, allow: bool) -> Self {
        self.allow_head_fallback = allow;
        self
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self::full()
    }
}

/// Per-block comparison outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Match,
    Mismatch,
    Indeterminate,
}

impl Classification {
    /// Status symbol used in summaries.
    pub fn symbol(&self) -> &'static str {
        match self {
            Classification::Match => "✅",
            Classification::Mismatch => "❌",
            Classification::Indeterminate => "⚠️",
        }
    }
}

/// A mismatching block with the two digests that were compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMismatch {
    pub index: u64,
    pub offset: u64,
    pub left: String,
    pub right: String,
}

/// Accumulated comparison outcome.
#[derive(Debug, Clone, Default)]
pub struct CompareReport {
    /// Number of common blocks examined.
    pub compared: usize,
    pub matches: usize,
    /// Mismatching blocks in ascending index order.
    pub mismatches: Vec<DigestMismatch>,
    /// Indices whose selected digest was absent on either side, ascending.
    pub indeterminate: Vec<u64>,
}

impl CompareReport {
    pub fn count(&self, classification: Classification) -> usize {
        match classification {
            Classification::Match => self.matches,
            Classification::Mismatch => self.mismatches.len(),
            Classification::Indeterminate => self.indeterminate.len(),
        }
    }

    /// True when no block mismatched.
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Symbolic one-line summary, e.g. `"3✅ 1❌ 0⚠️"`.
    pub fn summary(&self) -> String {
        [
            Classification::Match,
            Classification::Mismatch,
            Classification::Indeterminate,
        ]
        .iter()
        .map(|c| format!("{}{}", self.count(*c), c.symbol()))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

fn select_digest(block: &Block, config: CompareConfig) -> Option<&str> {
    match config.mode {
        CompareMode::HeadOnly => block.digest_head.as_deref(),
        CompareMode::Full => block.digest_full.as_deref().or(if config.allow_head_fallback {
            block.digest_head.as_deref()
        } else {
            None
        }),
    }
}

/// Compare two inventories block by block.
///
/// Only indices present in both inventories are examined, in ascending
/// order. Digest equality is case-sensitive hex string equality.
pub fn compare(
    left: &BlockInventory,
    right: &BlockInventory,
    config: CompareConfig,
) -> CompareReport {
    let left_blocks: BTreeMap<u64, &Block> = left.blocks.iter().map(|b| (b.index, b)).collect();
    let right_blocks: BTreeMap<u64, &Block> = right.blocks.iter().map(|b| (b.index, b)).collect();

    let mut report = CompareReport::default();

    for (&index, &left_block) in &left_blocks {
        let Some(&right_block) = right_blocks.get(&index) else {
            continue;
        };
        report.compared += 1;

        match (
            select_digest(left_block, config),
            select_digest(right_block, config),
        ) {
            (Some(l), Some(r)) if l == r => report.matches += 1,
            (Some(l), Some(r)) => report.mismatches.push(DigestMismatch {
                index,
                offset: left_block.offset,
                left: l.to_string(),
                right: r.to_string(),
            }),
            _ => report.indeterminate.push(index),
        }
    }

    report
}
