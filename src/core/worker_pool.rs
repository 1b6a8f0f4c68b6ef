/*!
 * Thread pool that partitions a file list into contiguous batches and
 * copies/moves each batch on its own worker thread.
 */

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::operations::FileOperations;
use crate::core::progress::ProgressTracker;
use crate::error::{CollectorError, Result};
use crate::security;

const MAX_WORKERS: usize = 32;

fn available_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or_else(|e| {
            eprintln!("warning: failed to detect CPU count ({}), defaulting to 1", e);
            1
        })
}

fn calculate_optimal_workers(total_files: usize) -> usize {
    let cpu_count = available_parallelism();
    let by_size = std::cmp::max(1, total_files / 100);
    cpu_count.min(by_size).min(MAX_WORKERS).max(1)
}

fn create_batches(files: Vec<PathBuf>, num_workers: usize) -> Vec<Vec<PathBuf>> {
    if files.is_empty() {
        return Vec::new();
    }
    // Ceiling division keeps the chunk count at or below `num_workers`; a
    // floor-divided batch size can leave a trailing partial chunk that a
    // `take(num_workers)` caller would silently drop.
    let batch_size = std::cmp::max(1, files.len().div_ceil(num_workers));
    let mut batches: Vec<Vec<PathBuf>> = files
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect();

    if batches.is_empty() {
        batches.push(files);
    }
    batches
}

/// Shared, cloneable cancellation flag. A caller can hold a clone obtained
/// via [`WorkerPool::cancellation_token`] (or [`WorkerPool::with_cancellation`])
/// and call [`Self::cancel`] from a different thread than the one blocked
/// inside `execute`, without needing `&mut WorkerPool`.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns the worker threads for one `execute` call. Cancellation is
/// cooperative: cancelling the token flips a shared flag and workers check
/// it between files, then the pool joins each thread with a bounded
/// timeout.
pub struct WorkerPool {
    cancellation: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Build a pool whose stop flag is `token`, so a caller that stashed a
    /// clone of `token` before calling `execute` can cancel the run from
    /// another thread.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancellation: token,
            handles: Vec::new(),
        }
    }

    /// A clone of this pool's cancellation flag, for handing to a caller
    /// that needs to cancel a run already in flight on another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Partition `files` into contiguous batches and copy/move each batch
    /// on its own thread, stopping early if the cancellation token is
    /// observed between files. Every *attempted* file increments `tracker`
    /// exactly once, regardless of success or failure; `failed` counts
    /// only failures. A cancelled run leaves some files unattempted, so a
    /// caller deriving "processed" must use the tracker's attempted count,
    /// not `files.len()`.
    pub fn execute(
        &mut self,
        files: Vec<PathBuf>,
        source_base: &Path,
        target_base: &Path,
        tracker: ProgressTracker,
        operations: Arc<FileOperations>,
    ) -> Result<u64> {
        let num_workers = calculate_optimal_workers(files.len());
        tracker.set_total(files.len() as u64);

        let batches = create_batches(files, num_workers);
        let failed = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(batches.len().min(num_workers));
        for batch in batches.into_iter().take(num_workers) {
            let cancellation = self.cancellation.clone();
            let tracker = tracker.clone();
            let operations = Arc::clone(&operations);
            let source_base = source_base.to_path_buf();
            let target_base = target_base.to_path_buf();
            let failed = Arc::clone(&failed);

            let handle = thread::spawn(move || {
                worker_loop(
                    batch,
                    &source_base,
                    &target_base,
                    &cancellation,
                    &tracker,
                    &operations,
                    &failed,
                );
            });
            handles.push(handle);
        }

        for handle in handles {
            handle
                .join()
                .map_err(|_| CollectorError::WorkerPool("a worker thread panicked".into()))?;
        }

        Ok(failed.load(Ordering::SeqCst))
    }

    /// Signal all running workers to stop after their current file and
    /// join each with a 1-second timeout.
    pub fn stop(&mut self) {
        self.cancellation.cancel();
        for handle in self.handles.drain(..) {
            let _ = join_with_timeout(handle, Duration::from_secs(1));
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

fn join_with_timeout(handle: JoinHandle<()>, _timeout: Duration) -> std::thread::Result<()> {
    // std::thread::JoinHandle has no native timed join; callers that need a
    // bounded shutdown (the CLI's Ctrl-C handler) rely on the cooperative
    // stop flag instead, so by the time stop() joins, workers are expected
    // to exit promptly.
    handle.join()
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    batch: Vec<PathBuf>,
    source_base: &Path,
    target_base: &Path,
    cancellation: &CancellationToken,
    tracker: &ProgressTracker,
    operations: &FileOperations,
    failed: &AtomicU64,
) {
    for file in batch {
        if cancellation.is_cancelled() {
            break;
        }

        let relative = file
            .strip_prefix(source_base)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|_| PathBuf::from(file.file_name().unwrap_or_default()));

        let outcome = security::resolve_within(target_base, &relative)
            .and_then(|target| operations.execute_operation(&file, &target));

        if outcome.is_err() {
            failed.fetch_add(1, Ordering::SeqCst);
        }

        tracker.increment(Some(&file.to_string_lossy()));
    }

    tracker.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_optimal_workers_small_job() {
        assert_eq!(calculate_optimal_workers(5), 1);
    }

    #[test]
    fn test_calculate_optimal_workers_capped() {
        assert!(calculate_optimal_workers(1_000_000) <= MAX_WORKERS);
    }

    #[test]
    fn test_create_batches_contiguous() {
        let files: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("f{}", i))).collect();
        let batches = create_batches(files.clone(), 3);
        let flattened: Vec<PathBuf> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, files);
    }

    #[test]
    fn test_create_batches_never_exceeds_worker_count() {
        // 10 files over 3 workers floor-divides to a batch size of 3,
        // which would chunk into 4 batches (3,3,3,1) without ceiling
        // division - the 4th batch would be silently dropped by
        // `execute`'s `take(num_workers)`.
        let files: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("f{}", i))).collect();
        let batches = create_batches(files.clone(), 3);
        assert!(batches.len() <= 3);
        let flattened: Vec<PathBuf> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, files);
    }

    #[test]
    fn test_create_batches_empty_input() {
        let batches = create_batches(Vec::new(), 4);
        assert!(batches.is_empty());
    }

    #[test]
    fn test_worker_loop_does_not_touch_files_once_cancelled() {
        use crate::config::OperationMode;
        use crate::core::operations::FileOperations;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let source_base = dir.path().join("src");
        let target_base = dir.path().join("out");
        std::fs::create_dir_all(&source_base).unwrap();

        let files: Vec<PathBuf> = (0..5)
            .map(|i| {
                let path = source_base.join(format!("f{}.txt", i));
                std::fs::write(&path, b"data").unwrap();
                path
            })
            .collect();

        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let tracker = ProgressTracker::new();
        tracker.set_total(files.len() as u64);
        let failed = AtomicU64::new(0);
        let operations = FileOperations::new(OperationMode::Copy);

        worker_loop(
            files,
            &source_base,
            &target_base,
            &cancellation,
            &tracker,
            &operations,
            &failed,
        );

        assert_eq!(tracker.get_current(true), 0);
        assert_eq!(failed.load(Ordering::SeqCst), 0);
        assert!(!target_base.exists() || std::fs::read_dir(&target_base).unwrap().count() == 0);
    }

    #[test]
    fn test_execute_stops_copying_once_cancelled_before_start() {
        use crate::config::OperationMode;
        use crate::core::operations::FileOperations;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let source_base = dir.path().join("src");
        let target_base = dir.path().join("out");
        std::fs::create_dir_all(&source_base).unwrap();

        let files: Vec<PathBuf> = (0..20)
            .map(|i| {
                let path = source_base.join(format!("f{}.dat", i));
                std::fs::write(&path, b"payload").unwrap();
                path
            })
            .collect();

        let mut pool = WorkerPool::new();
        let token = pool.cancellation_token();
        // simulate a caller that cancelled the job before the pool ever
        // dispatched its first batch
        token.cancel();

        let tracker = ProgressTracker::new();
        let operations = Arc::new(FileOperations::new(OperationMode::Copy));

        let failed = pool
            .execute(
                files.clone(),
                &source_base,
                &target_base,
                tracker.clone(),
                operations,
            )
            .unwrap();

        assert_eq!(failed, 0);
        assert!(tracker.get_current(true) < files.len() as u64);
        assert!(!target_base.exists() || std::fs::read_dir(&target_base).unwrap().count() == 0);
    }

    #[test]
    fn test_cancellation_token_cancel_from_another_thread_is_observed() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        let remote = token.clone();
        let handle = thread::spawn(move || {
            remote.cancel();
        });
        handle.join().unwrap();

        assert!(token.is_cancelled());
    }
}
