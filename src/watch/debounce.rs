// src/watch/debounce.rs

//! Per-path debouncing.
//!
//! Every `add` for a path (re)arms a timer; the callback fires once the path
//! has been quiet for the configured delay. Repeated notifications for the
//! same path collapse into a single firing.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

/// Future returned by a debounce callback.
pub type DispatchFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Action run when a path's quiet period elapses.
pub type DebounceCallback = Arc<dyn Fn(PathBuf) -> DispatchFuture + Send + Sync>;

/// Live timer for one pending path.
///
/// `generation` lets a firing timer check, under the lock, that it has not
/// been replaced or cancelled in the meantime.
struct PendingEntry {
    cancel: CancellationToken,
    generation: u64,
}

#[derive(Default)]
struct PendingMap {
    entries: HashMap<PathBuf, PendingEntry>,
    next_generation: u64,
}

struct Inner {
    delay: Duration,
    callback: Option<DebounceCallback>,
    pending: Mutex<PendingMap>,
    tracker: TaskTracker,
}

/// Coalesces bursts of notifications per path into one deferred action.
///
/// Cheap to clone; clones share the same pending map. Must be used from
/// within a tokio runtime.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.inner.delay)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl Debouncer {
    /// A `None` callback is allowed: timers still fire and clear their
    /// pending entry, they just have no side effect.
    pub fn new(delay: Duration, callback: Option<DebounceCallback>) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                callback,
                pending: Mutex::new(PendingMap::default()),
                tracker: TaskTracker::new(),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Arm (or re-arm) the timer for `path`.
    ///
    /// Any timer already pending for the path is cancelled first, so the
    /// delay is always measured from the most recent call.
    pub fn add(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let token = CancellationToken::new();

        let generation = {
            let mut pending = self.lock_pending();
            pending.next_generation += 1;
            let generation = pending.next_generation;
            let replaced = pending.entries.insert(
                path.clone(),
                PendingEntry {
                    cancel: token.clone(),
                    generation,
                },
            );
            if let Some(old) = replaced {
                old.cancel.cancel();
                trace!(?path, "debounce timer re-armed");
            }
            generation
        };

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(inner.delay) => {}
            }

            // Only the entry that armed this timer may fire it.
            {
                let mut pending = inner
                    .pending
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                match pending.entries.get(&path) {
                    Some(entry) if entry.generation == generation => {
                        pending.entries.remove(&path);
                    }
                    _ => return,
                }
            }

            debug!(?path, "debounce delay elapsed");
            if let Some(callback) = &inner.callback {
                callback(path).await;
            }
        });
    }

    /// Disarm the timer for `path`. Unknown or already-fired paths are a
    /// no-op.
    pub fn cancel(&self, path: &Path) {
        if let Some(entry) = self.lock_pending().entries.remove(path) {
            entry.cancel.cancel();
            debug!(?path, "debounce timer cancelled");
        }
    }

    /// Disarm every pending timer.
    pub fn cancel_all(&self) {
        let drained: Vec<PendingEntry> = {
            let mut pending = self.lock_pending();
            pending.entries.drain().map(|(_, entry)| entry).collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "cancelling all debounce timers");
        }
        for entry in drained {
            entry.cancel.cancel();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().entries.len()
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.lock_pending().entries.contains_key(path)
    }

    /// Wait for every spawned timer, including callbacks already running,
    /// to finish. Call after [`cancel_all`](Self::cancel_all) during
    /// shutdown; `add` must not be called afterwards.
    pub async fn drain(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingMap> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counting_callback(counter: Arc<AtomicUsize>) -> DebounceCallback {
        Arc::new(move |_path: PathBuf| -> DispatchFuture {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn nil_callback_still_clears_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(20), None);
        debouncer.add("/dl/a");
        assert!(debouncer.is_pending(Path::new("/dl/a")));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancel_unknown_path_is_noop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(10), Some(counting_callback(counter)));
        debouncer.cancel(Path::new("/never/added"));
        debouncer.cancel_all();
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_running_callbacks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let slow: DebounceCallback = {
            let counter = Arc::clone(&counter);
            Arc::new(move |_path: PathBuf| -> DispatchFuture {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    sleep(Duration::from_millis(50)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
        };

        let debouncer = Debouncer::new(Duration::from_millis(5), Some(slow));
        debouncer.add("/dl/a");
        sleep(Duration::from_millis(20)).await;

        debouncer.cancel_all();
        debouncer.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
