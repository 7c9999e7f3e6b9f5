//! Progress reporting for block fetches.
//!
//! Core logic never prints; callers inject a [`ProgressCallback`] and
//! render however they like. Parallel runs aggregate per-block byte counts
//! through atomic counters polled by a dedicated reporter thread.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Byte-level progress callback.
///
/// # Arguments
///
/// * `bytes_done` - Bytes fetched so far across the whole run
/// * `bytes_total` - Total bytes expected for the run
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Shared progress counters for parallel block fetches.
#[derive(Debug)]
pub struct ProgressCounters {
    /// Per-block byte counters, indexed by position within the run.
    block_progress: Vec<AtomicU64>,
    /// Number of blocks fully fetched.
    blocks_completed: AtomicUsize,
    /// Signal to stop the reporter thread.
    done: AtomicBool,
}

impl ProgressCounters {
    /// Create counters for the given number of blocks.
    pub fn new(num_blocks: usize) -> Self {
        Self {
            block_progress: (0..num_blocks).map(|_| AtomicU64::new(0)).collect(),
            blocks_completed: AtomicUsize::new(0),
            done: AtomicBool::new(false),
        }
    }

    /// Total bytes fetched across all blocks.
    pub fn total_bytes(&self) -> u64 {
        self.block_progress
            .iter()
            .map(|p| p.load(Ordering::SeqCst))
            .sum()
    }

    /// Number of completed blocks.
    pub fn completed_blocks(&self) -> usize {
        self.blocks_completed.load(Ordering::SeqCst)
    }

    /// Update the byte count for one block slot.
    pub fn update_block(&self, slot: usize, bytes: u64) {
        if slot < self.block_progress.len() {
            self.block_progress[slot].store(bytes, Ordering::SeqCst);
        }
    }

    /// Mark a block slot as completed with its final byte count.
    pub fn mark_completed(&self, slot: usize, final_bytes: u64) {
        if slot < self.block_progress.len() {
            self.block_progress[slot].store(final_bytes, Ordering::SeqCst);
            self.blocks_completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Signal that the run is over.
    pub fn signal_done(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    /// Check whether the run is over.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

/// Background reporter polling [`ProgressCounters`] and invoking a callback
/// with aggregated progress.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
    counters: Arc<ProgressCounters>,
}

impl ProgressReporter {
    /// Start a reporter polling at `poll_interval`.
    pub fn start(
        counters: Arc<ProgressCounters>,
        total_bytes: u64,
        callback: Arc<ProgressCallback>,
        poll_interval: Duration,
    ) -> Self {
        let counters_clone = Arc::clone(&counters);

        let handle = thread::spawn(move || {
            while !counters_clone.is_done() {
                callback(counters_clone.total_bytes(), total_bytes);
                thread::sleep(poll_interval);
            }

            // Final report
            callback(counters_clone.total_bytes(), total_bytes);
        });

        Self {
            handle: Some(handle),
            counters,
        }
    }

    /// Start a reporter with the default 100ms poll interval.
    pub fn start_default(
        counters: Arc<ProgressCounters>,
        total_bytes: u64,
        callback: Arc<ProgressCallback>,
    ) -> Self {
        Self::start(counters, total_bytes, callback, Duration::from_millis(100))
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.counters.signal_done();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counters_new() {
        let counters = ProgressCounters::new(3);
        assert_eq!(counters.total_bytes(), 0);
        assert_eq!(counters.completed_blocks(), 0);
        assert!(!counters.is_done());
    }

    #[test]
    fn test_progress_counters_update_block() {
        let counters = ProgressCounters::new(2);

        counters.update_block(0, 500);
        counters.update_block(1, 300);

        assert_eq!(counters.total_bytes(), 800);
    }

    #[test]
    fn test_progress_counters_mark_completed() {
        let counters = ProgressCounters::new(2);

        counters.mark_completed(0, 1000);

        assert_eq!(counters.completed_blocks(), 1);
        assert_eq!(counters.total_bytes(), 1000);
    }

    #[test]
    fn test_out_of_range_slot_ignored() {
        let counters = ProgressCounters::new(1);

        counters.update_block(5, 100);
        counters.mark_completed(5, 100);

        assert_eq!(counters.total_bytes(), 0);
        assert_eq!(counters.completed_blocks(), 0);
    }

    #[test]
    fn test_progress_reporter_lifecycle() {
        let counters = Arc::new(ProgressCounters::new(2));
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = Arc::clone(&call_count);

        let callback: ProgressCallback = Box::new(move |_done, _total| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let reporter = ProgressReporter::start(
            Arc::clone(&counters),
            1000,
            Arc::new(callback),
            Duration::from_millis(10),
        );

        thread::sleep(Duration::from_millis(50));
        drop(reporter);

        assert!(call_count.load(Ordering::SeqCst) > 0);
        assert!(counters.is_done());
    }
}
