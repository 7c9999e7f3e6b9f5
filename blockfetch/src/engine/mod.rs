//! Block download and scan orchestration.
//!
//! The engine ties the pure planner to an effectful run: resolve the
//! source size, enumerate block ranges, fetch and digest each block, and
//! persist the inventory after every completed block so an interrupted run
//! leaves exactly the blocks that finished.
//!
//! # Architecture
//!
//! ```text
//! DownloadEngine
//!         │
//!         ├── FetchStrategy (trait)
//!         │       ├── SequentialStrategy
//!         │       └── ParallelStrategy (bounded worker pool)
//!         │
//!         ├── fetch_block (stream + dual digest, one pass)
//!         │
//!         ├── BlockPlan (range arithmetic)
//!         │
//!         └── ProgressReporter (observer callback)
//! ```

mod fetch;
mod progress;
mod strategy;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

pub use progress::{ProgressCallback, ProgressCounters, ProgressReporter};

use crate::compare::{compare, CompareConfig, CompareReport};
use crate::digest::{digest_file_range, digest_range, DEFAULT_CHUNK_SIZE};
use crate::inventory::{metadata_path, Block, BlockInventory, InventoryError};
use crate::plan::{BlockPlan, PlanError, SizeUnit};
use crate::source::{BlockSource, LocalSource, SourceError, DEFAULT_TIMEOUT};
use strategy::{FetchStrategy, ParallelStrategy, SequentialStrategy};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while fetching or scanning blocks.
#[derive(Debug)]
pub enum EngineError {
    /// Size discovery or another pre-block source operation failed.
    Source(SourceError),

    /// Fetching one block failed.
    BlockFetch {
        index: u64,
        start: u64,
        end: u64,
        source_id: String,
        cause: SourceError,
    },

    /// Writing a part file or directory failed.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Invalid partitioning configuration.
    Plan(PlanError),

    /// Persisting or loading the inventory failed.
    Inventory(InventoryError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(e) => write!(f, "{}", e),
            Self::BlockFetch {
                index,
                start,
                end,
                source_id,
                cause,
            } => {
                write!(
                    f,
                    "block {} (bytes {}-{}) from {}: {}",
                    index, start, end, source_id, cause
                )
            }
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::Plan(e) => write!(f, "{}", e),
            Self::Inventory(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(e) => Some(e),
            Self::BlockFetch { cause, .. } => Some(cause),
            Self::WriteFailed { source, .. } => Some(source),
            Self::Plan(e) => Some(e),
            Self::Inventory(e) => Some(e),
        }
    }
}

impl From<SourceError> for EngineError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<PlanError> for EngineError {
    fn from(e: PlanError) -> Self {
        Self::Plan(e)
    }
}

impl From<InventoryError> for EngineError {
    fn from(e: InventoryError) -> Self {
        Self::Inventory(e)
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Read-chunk length; the head digest covers exactly one chunk.
    pub chunk_size: usize,
    /// Per-request timeout for HTTP sources.
    pub timeout: Duration,
    /// Number of blocks fetched concurrently; 1 selects the sequential
    /// strategy.
    pub parallel_fetches: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: DEFAULT_TIMEOUT,
            parallel_fetches: 1,
        }
    }
}

impl EngineConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_parallel_fetches(mut self, parallel_fetches: usize) -> Self {
        self.parallel_fetches = parallel_fetches.max(1);
        self
    }
}

/// Orchestrates block fetching, digesting and inventory persistence.
#[derive(Debug, Default)]
pub struct DownloadEngine {
    config: EngineConfig,
}

impl DownloadEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fetch blocks `[from_block, to_block]` from `source` into part files
    /// under `target_dir`, persisting `inventory` to `meta_path` after
    /// every completed block.
    ///
    /// `to_block` of `None` selects the final block; out-of-range indices
    /// are clamped. Any existing in-memory block list is cleared first —
    /// re-running the same range restarts it from scratch. On error the
    /// run aborts immediately; blocks persisted before the failure remain
    /// valid.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        source: &dyn BlockSource,
        target_dir: &Path,
        meta_path: &Path,
        inventory: &mut BlockInventory,
        from_block: u64,
        to_block: Option<u64>,
        on_progress: Option<ProgressCallback>,
    ) -> EngineResult<()> {
        let total_size = match inventory.total_size {
            Some(size) => size,
            None => {
                let size = source.resolve_size()?;
                inventory.total_size = Some(size);
                size
            }
        };

        let plan = BlockPlan::new(total_size, inventory.block_size, inventory.unit)?;
        let to_block = plan.clamp_to_block(to_block);
        let ranges = plan.ranges(from_block, to_block);
        let total_bytes = plan.range_bytes(from_block, to_block);

        fs::create_dir_all(target_dir).map_err(|e| EngineError::WriteFailed {
            path: target_dir.to_path_buf(),
            source: e,
        })?;

        inventory.blocks.clear();

        info!(
            source = source.identifier(),
            from_block,
            to_block,
            total_bytes,
            "fetching block range"
        );

        if ranges.is_empty() {
            inventory.save(meta_path)?;
            return Ok(());
        }

        let strategy: Box<dyn FetchStrategy> = if self.config.parallel_fetches <= 1 {
            Box::new(SequentialStrategy)
        } else {
            Box::new(ParallelStrategy::new(self.config.parallel_fetches))
        };

        let mut sink = |block: Block| -> EngineResult<()> {
            debug!(index = block.index, size = block.size, "block complete");
            inventory.blocks.push(block);
            inventory.save(meta_path)?;
            Ok(())
        };

        strategy.execute(
            source,
            &ranges,
            target_dir,
            self.config.chunk_size,
            total_bytes,
            on_progress.map(Arc::new),
            &mut sink,
        )
    }

    /// Build an inventory for an existing local file without materializing
    /// part files; every block records the file's basename as its path.
    ///
    /// With `head_only` set, full digests are skipped and each block costs
    /// a single chunk read.
    pub fn index_local(
        &self,
        path: &Path,
        block_size: u64,
        unit: SizeUnit,
        head_only: bool,
        on_progress: Option<ProgressCallback>,
    ) -> EngineResult<BlockInventory> {
        let source = LocalSource::new(path);
        let total_size = source.resolve_size()?;
        let plan = BlockPlan::new(total_size, block_size, unit)?;

        let mut inventory = BlockInventory::new(source.identifier(), block_size, unit);
        inventory.total_size = Some(total_size);

        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.identifier().to_string());

        let to_block = plan.clamp_to_block(None);
        let total_bytes = plan.range_bytes(0, to_block);
        let mut done: u64 = 0;

        for (index, start, end) in plan.ranges(0, to_block) {
            let size = end - start + 1;
            let block_fetch = |cause: SourceError| EngineError::BlockFetch {
                index,
                start,
                end,
                source_id: source.identifier().to_string(),
                cause,
            };

            let mut reader = source.read_range(start, end).map_err(block_fetch)?;
            let (head, full) = digest_range(&mut *reader, self.config.chunk_size, head_only)
                .map_err(|e| {
                    block_fetch(SourceError::Io {
                        source_id: source.identifier().to_string(),
                        source: e,
                    })
                })?;

            inventory.blocks.push(Block {
                index,
                path: basename.clone(),
                offset: start,
                size,
                digest_head: Some(head),
                digest_full: full,
            });

            done += size;
            if let Some(cb) = &on_progress {
                cb(done, total_bytes);
            }
        }

        Ok(inventory)
    }

    /// Load the sidecar inventory for `path`, or index the file and write
    /// one. An existing sidecar is trusted as-is; nothing is re-hashed.
    pub fn load_or_index(
        &self,
        path: &Path,
        block_size: u64,
        unit: SizeUnit,
        head_only: bool,
        on_progress: Option<ProgressCallback>,
    ) -> EngineResult<BlockInventory> {
        let meta_path = metadata_path(path);
        if meta_path.exists() {
            debug!(meta = %meta_path.display(), "loading existing inventory");
            return Ok(BlockInventory::load(&meta_path)?);
        }

        let inventory = self.index_local(path, block_size, unit, head_only, on_progress)?;
        inventory.save(&meta_path)?;
        info!(
            meta = %meta_path.display(),
            blocks = inventory.blocks.len(),
            "inventory written"
        );
        Ok(inventory)
    }

    /// Recompute digests from materialized block content under `dir` and
    /// classify every block against its stored record.
    ///
    /// A block whose file holds exactly `size` bytes is read as a part
    /// file from offset 0; otherwise the block is read at its recorded
    /// offset within a shared file. Unreadable content classifies the
    /// block as indeterminate instead of aborting the whole pass.
    pub fn verify_parts(&self, inventory: &BlockInventory, dir: &Path) -> CompareReport {
        let mut recomputed =
            BlockInventory::new(inventory.source.clone(), inventory.block_size, inventory.unit);
        recomputed.total_size = inventory.total_size;

        for block in &inventory.blocks {
            let path = dir.join(&block.path);
            let head_only = block.digest_full.is_none();

            let offset = match fs::metadata(&path) {
                Ok(meta) if meta.len() == block.size => 0,
                Ok(_) => block.offset,
                Err(e) => {
                    warn!(
                        index = block.index,
                        path = %path.display(),
                        error = %e,
                        "block content unreadable"
                    );
                    recomputed.blocks.push(Block {
                        digest_head: None,
                        digest_full: None,
                        ..block.clone()
                    });
                    continue;
                }
            };

            match digest_file_range(&path, offset, block.size, self.config.chunk_size, head_only)
            {
                Ok((head, full)) => recomputed.blocks.push(Block {
                    digest_head: Some(head),
                    digest_full: full,
                    ..block.clone()
                }),
                Err(e) => {
                    warn!(
                        index = block.index,
                        path = %path.display(),
                        error = %e,
                        "block content unreadable"
                    );
                    recomputed.blocks.push(Block {
                        digest_head: None,
                        digest_full: None,
                        ..block.clone()
                    });
                }
            }
        }

        // Head-only records verify head against head via the fallback.
        compare(
            inventory,
            &recomputed,
            CompareConfig::full().with_head_fallback(true),
        )
    }
}
