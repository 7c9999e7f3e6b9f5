//! Fetch strategies: sequential and bounded-parallel.
//!
//! Both strategies hand completed blocks to the caller's sink in ascending
//! index order, so the persisted inventory is identical regardless of which
//! strategy ran. A parallel run that hits a failure keeps only the blocks
//! below the lowest failing index, exactly the prefix a sequential run
//! would have left behind.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use super::fetch::{fetch_block, part_file_name};
use super::progress::{ProgressCallback, ProgressCounters, ProgressReporter};
use super::{EngineError, EngineResult};
use crate::inventory::Block;
use crate::source::BlockSource;

/// Receives completed blocks in ascending index order.
pub(crate) type BlockSink<'a> = dyn FnMut(Block) -> EngineResult<()> + 'a;

/// Strategy for fetching a set of block ranges.
pub(crate) trait FetchStrategy {
    fn execute(
        &self,
        source: &dyn BlockSource,
        ranges: &[(u64, u64, u64)],
        target_dir: &Path,
        chunk_size: usize,
        total_bytes: u64,
        on_progress: Option<Arc<ProgressCallback>>,
        sink: &mut BlockSink<'_>,
    ) -> EngineResult<()>;
}

/// Fetch blocks one at a time, in index order.
#[derive(Debug, Default)]
pub(crate) struct SequentialStrategy;

impl FetchStrategy for SequentialStrategy {
    fn execute(
        &self,
        source: &dyn BlockSource,
        ranges: &[(u64, u64, u64)],
        target_dir: &Path,
        chunk_size: usize,
        total_bytes: u64,
        on_progress: Option<Arc<ProgressCallback>>,
        sink: &mut BlockSink<'_>,
    ) -> EngineResult<()> {
        let mut base: u64 = 0;

        for &(index, start, end) in ranges {
            let target = target_dir.join(part_file_name(index));

            let block = if let Some(cb) = &on_progress {
                let cb = Arc::clone(cb);
                let on_chunk = move |bytes: u64| cb(base + bytes, total_bytes);
                fetch_block(
                    source,
                    index,
                    start,
                    end,
                    &target,
                    chunk_size,
                    Some(&on_chunk),
                )?
            } else {
                fetch_block(source, index, start, end, &target, chunk_size, None)?
            };

            base += block.size;
            if let Some(cb) = &on_progress {
                cb(base, total_bytes);
            }
            sink(block)?;
        }

        Ok(())
    }
}

/// Fetch blocks concurrently with a bounded worker pool.
#[derive(Debug)]
pub(crate) struct ParallelStrategy {
    concurrency: usize,
}

impl ParallelStrategy {
    pub(crate) fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }
}

impl FetchStrategy for ParallelStrategy {
    fn execute(
        &self,
        source: &dyn BlockSource,
        ranges: &[(u64, u64, u64)],
        target_dir: &Path,
        chunk_size: usize,
        total_bytes: u64,
        on_progress: Option<Arc<ProgressCallback>>,
        sink: &mut BlockSink<'_>,
    ) -> EngineResult<()> {
        let counters = Arc::new(ProgressCounters::new(ranges.len()));

        let _reporter = on_progress.map(|cb| {
            ProgressReporter::start_default(Arc::clone(&counters), total_bytes, cb)
        });

        for (batch_index, batch) in ranges.chunks(self.concurrency).enumerate() {
            let batch_offset = batch_index * self.concurrency;

            let results: Vec<EngineResult<Block>> = thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .enumerate()
                    .map(|(j, &(index, start, end))| {
                        let counters = Arc::clone(&counters);
                        let slot = batch_offset + j;
                        let target = target_dir.join(part_file_name(index));

                        scope.spawn(move || {
                            let chunk_counters = Arc::clone(&counters);
                            let on_chunk =
                                move |bytes: u64| chunk_counters.update_block(slot, bytes);

                            let result = fetch_block(
                                source,
                                index,
                                start,
                                end,
                                &target,
                                chunk_size,
                                Some(&on_chunk),
                            );
                            if let Ok(block) = &result {
                                counters.mark_completed(slot, block.size);
                            }
                            result
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|h| h.join().expect("block fetch worker panicked"))
                    .collect()
            });

            // Results arrive in ascending index order. Past the lowest
            // failing index, completed part files are discarded so the
            // run leaves the same prefix a sequential run would.
            let mut failure: Option<EngineError> = None;
            for result in results {
                match result {
                    Ok(block) if failure.is_none() => sink(block)?,
                    Ok(block) => {
                        let _ = fs::remove_file(target_dir.join(&block.path));
                    }
                    Err(e) => {
                        if failure.is_none() {
                            failure = Some(e);
                        }
                    }
                }
            }
            if let Some(e) = failure {
                return Err(e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::source::mock::MockSource;

    fn ranges_for(len: u64, block: u64) -> Vec<(u64, u64, u64)> {
        crate::plan::BlockPlan::from_bytes(len, block)
            .unwrap()
            .ranges(0, u64::MAX)
    }

    fn run_strategy(
        strategy: &dyn FetchStrategy,
        source: &MockSource,
        ranges: &[(u64, u64, u64)],
        dir: &Path,
    ) -> (Vec<Block>, EngineResult<()>) {
        let mut collected = Vec::new();
        let mut sink = |block: Block| -> EngineResult<()> {
            collected.push(block);
            Ok(())
        };
        let result = strategy.execute(source, ranges, dir, 512, 0, None, &mut sink);
        (collected, result)
    }

    #[test]
    fn test_sequential_ascending_order() {
        let temp = TempDir::new().unwrap();
        let source = MockSource::new((0..=255u8).cycle().take(2500).collect());
        let ranges = ranges_for(2500, 1000);

        let (blocks, result) = run_strategy(&SequentialStrategy, &source, &ranges, temp.path());

        result.unwrap();
        let indices: Vec<u64> = blocks.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(blocks[2].size, 500);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let ranges = ranges_for(5000, 1000);

        let seq_temp = TempDir::new().unwrap();
        let (seq_blocks, seq_result) = run_strategy(
            &SequentialStrategy,
            &MockSource::new(data.clone()),
            &ranges,
            seq_temp.path(),
        );
        seq_result.unwrap();

        let par_temp = TempDir::new().unwrap();
        let (par_blocks, par_result) = run_strategy(
            &ParallelStrategy::new(3),
            &MockSource::new(data),
            &ranges,
            par_temp.path(),
        );
        par_result.unwrap();

        assert_eq!(seq_blocks, par_blocks);
    }

    #[test]
    fn test_parallel_failure_keeps_sequential_prefix() {
        let temp = TempDir::new().unwrap();
        // Block 2 (bytes 2000..) fails; blocks 0 and 1 must survive even
        // though all three run in the same batch.
        let source = MockSource::new(vec![9u8; 4000]).failing_from(2000);
        let ranges = ranges_for(4000, 1000);

        let (blocks, result) = run_strategy(&ParallelStrategy::new(4), &source, &ranges, temp.path());

        let err = result.unwrap_err();
        match err {
            EngineError::BlockFetch { index, .. } => assert_eq!(index, 2),
            other => panic!("expected BlockFetch, got {:?}", other),
        }
        assert_eq!(blocks.len(), 2);
        assert!(temp.path().join("0000.part").exists());
        assert!(temp.path().join("0001.part").exists());
        assert!(!temp.path().join("0003.part").exists());
    }

    #[test]
    fn test_parallel_concurrency_minimum() {
        let strategy = ParallelStrategy::new(0);
        assert_eq!(strategy.concurrency, 1);
    }
}
