//! BlockFetch - block-range downloading and block-wise integrity checking.
//!
//! This library partitions a large file (local or remote) into fixed-size
//! byte-range blocks, fetches or reads each block independently while
//! computing head and full SHA-256 digests, persists the resulting block
//! inventory as a JSON sidecar, and compares two inventories block by
//! block without re-reading entire files.

pub mod compare;
pub mod digest;
pub mod engine;
pub mod inventory;
pub mod plan;
pub mod source;

pub use compare::{
    compare, Classification, CompareConfig, CompareMode, CompareReport, DigestMismatch,
};
pub use engine::{DownloadEngine, EngineConfig, EngineError, EngineResult, ProgressCallback};
pub use inventory::{metadata_path, Block, BlockInventory, InventoryError, InventoryResult};
pub use plan::{format_size, BlockPlan, PlanError, PlanResult, SizeUnit};
pub use source::{BlockSource, HttpSource, LocalSource, SourceError, SourceResult};
