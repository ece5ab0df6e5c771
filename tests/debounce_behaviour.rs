use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, Instant};

use dropwatch::watch::{DebounceCallback, Debouncer, DispatchFuture};
use dropwatch_test_utils::{init_tracing, with_timeout};

type Firings = Arc<Mutex<Vec<(PathBuf, Instant)>>>;

fn recording_callback(firings: Firings) -> DebounceCallback {
    Arc::new(move |path: PathBuf| -> DispatchFuture {
        let firings = Arc::clone(&firings);
        Box::pin(async move {
            firings.lock().unwrap().push((path, Instant::now()));
        })
    })
}

fn fired_for(firings: &Firings, path: &str) -> Vec<Instant> {
    firings
        .lock()
        .unwrap()
        .iter()
        .filter(|(p, _)| p == Path::new(path))
        .map(|(_, at)| *at)
        .collect()
}

#[tokio::test]
async fn burst_of_adds_fires_once_after_last_add() {
    init_tracing();
    with_timeout(async {
        let firings: Firings = Arc::default();
        let delay = Duration::from_millis(150);
        let debouncer = Debouncer::new(delay, Some(recording_callback(Arc::clone(&firings))));
        assert_eq!(debouncer.delay(), delay);

        for _ in 0..4 {
            debouncer.add("/dl/x");
            sleep(Duration::from_millis(40)).await;
        }
        debouncer.add("/dl/x");
        let last_add = Instant::now();
        assert_eq!(debouncer.pending_count(), 1);

        sleep(Duration::from_millis(400)).await;

        let fired = fired_for(&firings, "/dl/x");
        assert_eq!(fired.len(), 1, "burst must collapse into one firing");
        assert!(fired[0].duration_since(last_add) >= delay);
        assert!(!debouncer.is_pending(Path::new("/dl/x")));
    })
    .await;
}

#[tokio::test]
async fn different_paths_fire_independently() {
    init_tracing();
    with_timeout(async {
        let firings: Firings = Arc::default();
        let debouncer = Debouncer::new(
            Duration::from_millis(80),
            Some(recording_callback(Arc::clone(&firings))),
        );

        debouncer.add("/dl/a");
        debouncer.add("/dl/b");
        assert_eq!(debouncer.pending_count(), 2);

        debouncer.cancel(Path::new("/dl/a"));
        assert!(!debouncer.is_pending(Path::new("/dl/a")));
        assert!(debouncer.is_pending(Path::new("/dl/b")));

        sleep(Duration::from_millis(300)).await;

        assert!(fired_for(&firings, "/dl/a").is_empty());
        assert_eq!(fired_for(&firings, "/dl/b").len(), 1);
    })
    .await;
}

#[tokio::test]
async fn cancel_after_fire_is_a_noop() {
    init_tracing();
    with_timeout(async {
        let firings: Firings = Arc::default();
        let debouncer = Debouncer::new(
            Duration::from_millis(10),
            Some(recording_callback(Arc::clone(&firings))),
        );

        debouncer.add("/dl/a");
        sleep(Duration::from_millis(150)).await;
        assert_eq!(fired_for(&firings, "/dl/a").len(), 1);

        debouncer.cancel(Path::new("/dl/a"));
        debouncer.cancel(Path::new("/dl/a"));
        assert_eq!(debouncer.pending_count(), 0);
    })
    .await;
}

#[tokio::test]
async fn cancel_all_prevents_every_firing() {
    init_tracing();
    with_timeout(async {
        let firings: Firings = Arc::default();
        let debouncer = Debouncer::new(
            Duration::from_millis(80),
            Some(recording_callback(Arc::clone(&firings))),
        );

        for name in ["/dl/a", "/dl/b", "/dl/c"] {
            debouncer.add(name);
        }
        debouncer.cancel_all();
        assert_eq!(debouncer.pending_count(), 0);

        sleep(Duration::from_millis(250)).await;
        assert!(firings.lock().unwrap().is_empty());
    })
    .await;
}

#[tokio::test]
async fn concurrent_adds_from_many_tasks_coalesce() {
    init_tracing();
    with_timeout(async {
        let firings: Firings = Arc::default();
        let debouncer = Debouncer::new(
            Duration::from_millis(100),
            Some(recording_callback(Arc::clone(&firings))),
        );

        let mut handles = Vec::new();
        for _ in 0..16 {
            let debouncer = debouncer.clone();
            handles.push(tokio::spawn(async move {
                debouncer.add("/dl/shared");
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        sleep(Duration::from_millis(350)).await;
        assert_eq!(fired_for(&firings, "/dl/shared").len(), 1);
    })
    .await;
}
