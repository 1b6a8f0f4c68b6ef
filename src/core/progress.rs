/*!
 * Progress tracking with thread-local batching
 *
 * Workers increment a thread-local counter on every file and only take the
 * shared lock once the local count crosses a batch threshold, or when the
 * caller forces a flush. Batch size and notify interval scale with the
 * total job size so small jobs still feel responsive and large jobs don't
 * thrash the lock.
 */

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Callback invoked on each (throttled) progress notification.
pub type ProgressCallback = Box<dyn Fn(f64, u64, u64, Option<&str>) + Send + Sync>;

struct Inner {
    total: u64,
    current: u64,
    current_file: Option<String>,
    last_notify: Option<Instant>,
    callbacks: Vec<(u64, ProgressCallback)>,
    next_subscriber_id: u64,
}

/// `(batch_size, notify_interval_secs)` thresholds keyed by job size, ported
/// from the original tracker's adaptive table: tiny jobs notify on every
/// file, huge jobs batch aggressively to keep the shared lock cold.
fn adaptive_thresholds(total: u64) -> (u64, f64) {
    if total <= 10 {
        (1, 0.01)
    } else if total <= 100 {
        (10, 0.1)
    } else if total < 1000 {
        (300, 0.5)
    } else {
        (500, 0.5)
    }
}

static NEXT_TRACKER_ID: AtomicU64 = AtomicU64::new(1);

// Keyed by tracker id rather than one bare `Cell`, so two `ProgressTracker`
// instances that happen to run on the same OS thread (e.g. sequential jobs
// driven from a reused thread) get independent pending counters instead of
// silently clobbering each other's state.
thread_local! {
    static LOCAL_COUNTS: RefCell<HashMap<u64, u64>> = RefCell::new(HashMap::new());
}

/// Shared, thread-safe progress tracker. Clone to hand copies to worker
/// threads; all clones share the same underlying state via `Arc` and the
/// same thread-local pending-counter slot (keyed by `id`).
#[derive(Clone)]
pub struct ProgressTracker {
    id: u64,
    inner: Arc<Mutex<Inner>>,
    batch_size: Arc<Mutex<u64>>,
    notify_interval: Arc<Mutex<f64>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            id: NEXT_TRACKER_ID.fetch_add(1, AtomicOrdering::Relaxed),
            inner: Arc::new(Mutex::new(Inner {
                total: 0,
                current: 0,
                current_file: None,
                last_notify: None,
                callbacks: Vec::new(),
                next_subscriber_id: 0,
            })),
            batch_size: Arc::new(Mutex::new(300)),
            notify_interval: Arc::new(Mutex::new(0.5)),
        }
    }

    /// Add 1 to this instance's pending count on the calling thread and
    /// report whether it has reached the batch threshold.
    fn local_increment(&self, batch_size: u64) -> bool {
        LOCAL_COUNTS.with(|counts| {
            let mut counts = counts.borrow_mut();
            let entry = counts.entry(self.id).or_insert(0);
            *entry += 1;
            *entry >= batch_size
        })
    }

    /// Take and zero this instance's pending count on the calling thread.
    fn local_take(&self) -> u64 {
        LOCAL_COUNTS.with(|counts| counts.borrow_mut().remove(&self.id).unwrap_or(0))
    }

    /// Drop this instance's pending count on the calling thread without
    /// merging it (used by `set_total` to start a fresh job).
    fn local_clear(&self) {
        LOCAL_COUNTS.with(|counts| {
            counts.borrow_mut().remove(&self.id);
        });
    }

    /// Reset tracker state for a new job of `total` files and recompute the
    /// adaptive batch size / notify interval for that size.
    pub fn set_total(&self, total: u64) {
        let (batch_size, interval) = adaptive_thresholds(total);
        *self.batch_size.lock().unwrap() = batch_size;
        *self.notify_interval.lock().unwrap() = interval;

        let mut inner = self.inner.lock().unwrap();
        inner.total = total;
        inner.current = 0;
        inner.current_file = None;
        inner.last_notify = None;

        self.local_clear();
    }

    pub fn get_total(&self) -> u64 {
        self.inner.lock().unwrap().total
    }

    /// Record completion of one file (success or failure - callers track
    /// failure separately). Increments this instance's thread-local counter
    /// and only flushes to shared state once the batch threshold is crossed.
    pub fn increment(&self, current_file: Option<&str>) {
        let batch_size = *self.batch_size.lock().unwrap();
        let should_flush = self.local_increment(batch_size);

        if should_flush {
            self.flush_with_file(current_file);
        }
    }

    /// Merge the thread-local pending count into shared state, update the
    /// last-seen filename, and notify subscribers if the throttle allows.
    /// Locals are read and reset before the lock is taken.
    pub fn flush(&self) {
        self.flush_with_file(None);
    }

    fn flush_with_file(&self, current_file: Option<&str>) {
        let local_count = self.local_take();

        if local_count == 0 && current_file.is_none() {
            return;
        }

        let interval = *self.notify_interval.lock().unwrap();
        let (file_for_callbacks, callbacks_snapshot, percentage, current, total) = {
            let mut inner = self.inner.lock().unwrap();
            inner.current += local_count;
            if let Some(file) = current_file {
                inner.current_file = Some(file.to_string());
            }

            let now = Instant::now();
            let elapsed_enough = match inner.last_notify {
                None => true,
                Some(last) => now.duration_since(last).as_secs_f64() >= interval,
            };
            let small_job_always_notifies = inner.total > 0 && inner.total <= 10;
            let should_notify = elapsed_enough || small_job_always_notifies;

            if !should_notify {
                (None, Vec::new(), 0.0, 0, 0)
            } else {
                inner.last_notify = Some(now);
                let percentage = if inner.total > 0 {
                    (inner.current as f64 / inner.total as f64) * 100.0
                } else {
                    0.0
                };
                let snapshot: Vec<u64> = inner.callbacks.iter().map(|(id, _)| *id).collect();
                (
                    inner.current_file.clone(),
                    snapshot,
                    percentage,
                    inner.current,
                    inner.total,
                )
            }
        };

        if callbacks_snapshot.is_empty() {
            return;
        }

        let inner = self.inner.lock().unwrap();
        for (id, callback) in &inner.callbacks {
            if callbacks_snapshot.contains(id) {
                // Swallow subscriber panics - a broken callback must never
                // abort file collection.
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    callback(percentage, current, total, file_for_callbacks.as_deref());
                }));
                if result.is_err() {
                    tracing::warn!("progress subscriber callback panicked; ignoring");
                }
            }
        }
    }

    /// Subscribe a callback; returns an id usable with [`Self::unsubscribe`].
    pub fn subscribe(&self, callback: ProgressCallback) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner.callbacks.push((id, callback));
        id
    }

    /// Idempotent: unsubscribing an id that isn't present is a no-op.
    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.callbacks.retain(|(cb_id, _)| *cb_id != id);
    }

    pub fn reset(&self) {
        self.set_total(0);
    }

    /// Read the current count, optionally forcing a flush of this thread's
    /// pending local count first.
    pub fn get_current(&self, force_flush: bool) -> u64 {
        if force_flush {
            self.flush();
        }
        self.inner.lock().unwrap().current
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_adaptive_thresholds() {
        assert_eq!(adaptive_thresholds(5), (1, 0.01));
        assert_eq!(adaptive_thresholds(50), (10, 0.1));
        assert_eq!(adaptive_thresholds(500), (300, 0.5));
        assert_eq!(adaptive_thresholds(5000), (500, 0.5));
    }

    #[test]
    fn test_small_job_notifies_every_increment() {
        let tracker = ProgressTracker::new();
        tracker.set_total(3);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        tracker.subscribe(Box::new(move |_, _, _, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        tracker.increment(Some("a"));
        tracker.increment(Some("b"));
        tracker.increment(Some("c"));

        assert_eq!(tracker.get_current(false), 3);
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let tracker = ProgressTracker::new();
        let id = tracker.subscribe(Box::new(|_, _, _, _| {}));
        tracker.unsubscribe(id);
        tracker.unsubscribe(id);
    }

    #[test]
    fn test_force_flush_reflects_pending_local_count() {
        let tracker = ProgressTracker::new();
        tracker.set_total(1000);
        tracker.increment(Some("partial"));
        assert_eq!(tracker.get_current(true), 1);
    }

    #[test]
    fn test_reset_clears_state() {
        let tracker = ProgressTracker::new();
        tracker.set_total(100);
        tracker.increment(Some("a"));
        tracker.reset();
        assert_eq!(tracker.get_total(), 0);
        assert_eq!(tracker.get_current(false), 0);
    }

    #[test]
    fn test_concurrent_increments_from_n_threads_sum_exactly() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 137;

        let tracker = ProgressTracker::new();
        tracker.set_total(THREADS * PER_THREAD);

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        tracker.increment(Some(&i.to_string()));
                    }
                    // every worker must flush its own pending count before
                    // exiting - only the owning thread may touch it.
                    tracker.flush();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.get_current(false), THREADS * PER_THREAD);
    }

    #[test]
    fn test_two_trackers_on_same_thread_do_not_clobber_each_other() {
        // Regression test: a single module-global thread-local pending
        // counter would let a second tracker's `set_total` wipe out a
        // first tracker's not-yet-flushed pending count on the same
        // thread.
        let a = ProgressTracker::new();
        a.set_total(1000);
        a.increment(Some("a-pending"));

        let b = ProgressTracker::new();
        b.set_total(1000);
        b.increment(Some("b-pending"));

        assert_eq!(a.get_current(true), 1);
        assert_eq!(b.get_current(true), 1);
    }
}
