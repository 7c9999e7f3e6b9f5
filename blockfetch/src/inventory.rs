//! Persisted block inventories.
//!
//! A [`BlockInventory`] is the ordered collection of per-block metadata for
//! one logical file, stored as a JSON sidecar next to the file it
//! describes. The sidecar is the durable owner of the records; in-memory
//! inventories are transient views flushed to or rebuilt from it. Loading
//! an existing sidecar short-circuits re-computation entirely.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::SizeUnit;

/// Suffix appended to a source path to name its sidecar.
pub const METADATA_SUFFIX: &str = ".blocks.json";

/// Result type for inventory persistence.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors reading or writing inventory sidecars.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to parse {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode inventory for {path}: {source}")]
    EncodeFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Metadata for one block of a logical file.
///
/// `offset` is stored rather than derived so historical records with
/// irregular offsets survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Part-file name, or the shared file basename when blocks are regions
    /// of one contiguous file.
    pub path: String,
    pub offset: u64,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_head: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_full: Option<String>,
}

/// Ordered block metadata for one logical file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInventory {
    /// Local path or remote URL this inventory describes.
    pub source: String,
    /// Block size in `unit` multiples.
    pub block_size: u64,
    pub unit: SizeUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl BlockInventory {
    /// Create an empty inventory with the given partitioning configuration.
    pub fn new(source: impl Into<String>, block_size: u64, unit: SizeUnit) -> Self {
        Self {
            source: source.into(),
            block_size,
            unit,
            total_size: None,
            blocks: Vec::new(),
        }
    }

    /// Load an inventory from its sidecar file.
    pub fn load(meta_path: &Path) -> InventoryResult<Self> {
        let text = fs::read_to_string(meta_path).map_err(|e| InventoryError::ReadFailed {
            path: meta_path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| InventoryError::ParseFailed {
            path: meta_path.to_path_buf(),
            source: e,
        })
    }

    /// Write the inventory to its sidecar file.
    ///
    /// The record is written to a temporary sibling and renamed into place,
    /// so a crash mid-write never leaves a torn sidecar.
    pub fn save(&self, meta_path: &Path) -> InventoryResult<()> {
        let text =
            serde_json::to_string_pretty(self).map_err(|e| InventoryError::EncodeFailed {
                path: meta_path.to_path_buf(),
                source: e,
            })?;

        let write_failed = |e: io::Error| InventoryError::WriteFailed {
            path: meta_path.to_path_buf(),
            source: e,
        };

        let mut tmp_name = meta_path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, text).map_err(write_failed)?;
        fs::rename(&tmp_path, meta_path).map_err(write_failed)
    }
}

/// Sidecar path for a source file: `<path>.blocks.json`.
pub fn metadata_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn sample_inventory() -> BlockInventory {
        let mut inventory = BlockInventory::new("data.jnl", 10, SizeUnit::Mb);
        inventory.total_size = Some(25 * 1024 * 1024);
        inventory.blocks = vec![
            Block {
                index: 0,
                path: "0000.part".to_string(),
                offset: 0,
                size: 10 * 1024 * 1024,
                digest_head: Some("aa".repeat(32)),
                digest_full: Some("bb".repeat(32)),
            },
            Block {
                index: 1,
                path: "0001.part".to_string(),
                offset: 10 * 1024 * 1024,
                size: 10 * 1024 * 1024,
                digest_head: Some("cc".repeat(32)),
                digest_full: None,
            },
        ];
        inventory
    }

    #[test]
    fn test_metadata_path() {
        assert_eq!(
            metadata_path(Path::new("/data/file.jnl")),
            PathBuf::from("/data/file.jnl.blocks.json")
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let meta_path = temp.path().join("data.jnl.blocks.json");

        let inventory = sample_inventory();
        inventory.save(&meta_path).unwrap();
        let loaded = BlockInventory::load(&meta_path).unwrap();

        assert_eq!(loaded, inventory);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let meta_path = temp.path().join("data.jnl.blocks.json");

        sample_inventory().save(&meta_path).unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["data.jnl.blocks.json"]);
    }

    #[test]
    fn test_absent_digests_not_serialized() {
        let temp = TempDir::new().unwrap();
        let meta_path = temp.path().join("meta.json");

        sample_inventory().save(&meta_path).unwrap();
        let text = fs::read_to_string(&meta_path).unwrap();

        // Block 1 has no full digest; the key must be absent, not null.
        assert_eq!(text.matches("digest_full").count(), 1);
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_unit_serialized_as_upper_case() {
        let temp = TempDir::new().unwrap();
        let meta_path = temp.path().join("meta.json");

        sample_inventory().save(&meta_path).unwrap();
        let text = fs::read_to_string(&meta_path).unwrap();

        assert!(text.contains("\"MB\""));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BlockInventory::load(Path::new("/nonexistent/meta.json")).unwrap_err();
        assert!(matches!(err, InventoryError::ReadFailed { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        let meta_path = temp.path().join("meta.json");
        fs::write(&meta_path, "{ not json").unwrap();

        let err = BlockInventory::load(&meta_path).unwrap_err();
        assert!(matches!(err, InventoryError::ParseFailed { .. }));
    }
}
