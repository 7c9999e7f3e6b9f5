//! Single-block fetch: stream a byte range into a part file while
//! accumulating head and full digests in one pass.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::warn;

use super::{EngineError, EngineResult};
use crate::digest::{read_chunk, BlockHasher};
use crate::inventory::Block;
use crate::source::{BlockSource, SourceError};

/// Part-file name for a block index, e.g. `0002.part`.
pub(crate) fn part_file_name(index: u64) -> String {
    format!("{:04}.part", index)
}

/// Fetch one block from `source` into `target`, digesting as bytes arrive.
///
/// The stored size is the requested range length even when the server
/// answers a range request with the whole body (status 200); a length
/// divergence is logged, matching how such responses have always been
/// written out in full.
pub(crate) fn fetch_block(
    source: &dyn BlockSource,
    index: u64,
    start: u64,
    end: u64,
    target: &Path,
    chunk_size: usize,
    on_chunk: Option<&(dyn Fn(u64) + Sync)>,
) -> EngineResult<Block> {
    let block_fetch = |cause: SourceError| EngineError::BlockFetch {
        index,
        start,
        end,
        source_id: source.identifier().to_string(),
        cause,
    };
    let write_failed = |e: std::io::Error| EngineError::WriteFailed {
        path: target.to_path_buf(),
        source: e,
    };

    let mut reader = source.read_range(start, end).map_err(block_fetch)?;

    let file = File::create(target).map_err(write_failed)?;
    let mut writer = BufWriter::new(file);
    let mut hasher = BlockHasher::new();
    let mut buf = vec![0u8; chunk_size];
    let mut written: u64 = 0;

    loop {
        let n = read_chunk(&mut *reader, &mut buf).map_err(|e| {
            block_fetch(SourceError::Io {
                source_id: source.identifier().to_string(),
                source: e,
            })
        })?;
        if n == 0 {
            break;
        }

        writer.write_all(&buf[..n]).map_err(write_failed)?;
        hasher.update(&buf[..n]);
        written += n as u64;

        if let Some(cb) = on_chunk {
            cb(written);
        }
    }

    writer.flush().map_err(write_failed)?;

    let size = end - start + 1;
    if written != size {
        warn!(
            index,
            expected = size,
            received = written,
            source = source.identifier(),
            "range length mismatch"
        );
    }

    let (head, full) = hasher.finalize();
    Ok(Block {
        index,
        path: target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| part_file_name(index)),
        offset: start,
        size,
        digest_head: Some(head),
        digest_full: Some(full),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    use super::*;
    use crate::source::mock::MockSource;

    #[test]
    fn test_part_file_name() {
        assert_eq!(part_file_name(0), "0000.part");
        assert_eq!(part_file_name(42), "0042.part");
        assert_eq!(part_file_name(12345), "12345.part");
    }

    #[test]
    fn test_fetch_block_writes_part_and_digests() {
        let temp = TempDir::new().unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        let source = MockSource::new(data.clone());
        let target = temp.path().join(part_file_name(1));

        let block = fetch_block(&source, 1, 1024, 2047, &target, 512, None).unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.offset, 1024);
        assert_eq!(block.size, 1024);
        assert_eq!(block.path, "0001.part");
        assert_eq!(fs::read(&target).unwrap(), &data[1024..2048]);

        let expected_full = format!("{:x}", Sha256::digest(&data[1024..2048]));
        let expected_head = format!("{:x}", Sha256::digest(&data[1024..1536]));
        assert_eq!(block.digest_full.as_deref(), Some(expected_full.as_str()));
        assert_eq!(block.digest_head.as_deref(), Some(expected_head.as_str()));
    }

    #[test]
    fn test_fetch_block_reports_chunks() {
        let temp = TempDir::new().unwrap();
        let source = MockSource::new(vec![7u8; 2000]);
        let target = temp.path().join("0000.part");

        let last_seen = AtomicU64::new(0);
        let on_chunk = |bytes: u64| last_seen.store(bytes, Ordering::SeqCst);

        fetch_block(&source, 0, 0, 1999, &target, 512, Some(&on_chunk)).unwrap();

        assert_eq!(last_seen.load(Ordering::SeqCst), 2000);
    }

    #[test]
    fn test_fetch_block_range_error_carries_context() {
        let temp = TempDir::new().unwrap();
        let source = MockSource::new(vec![0u8; 100]).failing_from(0);
        let target = temp.path().join("0000.part");

        let err = fetch_block(&source, 0, 0, 99, &target, 512, None).unwrap_err();

        match err {
            EngineError::BlockFetch {
                index,
                start,
                end,
                cause: SourceError::RangeStatus { status, .. },
                ..
            } => {
                assert_eq!((index, start, end), (0, 0, 99));
                assert_eq!(status, 404);
            }
            other => panic!("expected BlockFetch, got {:?}", other),
        }
        // Failed range fetch leaves no part file behind.
        assert!(!target.exists());
    }
}
