use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use dropwatch::fs::mock::MockFileSystem;
use dropwatch::fs::RealFileSystem;
use dropwatch::watch::{StabilityError, StabilityGate};
use dropwatch_test_utils::{init_tracing, with_timeout};

const FILE: &str = "/downloads/movie.mkv";

/// Keep appending to `path` every `every` until `stop` fires.
fn spawn_writer(fs: MockFileSystem, every: Duration, stop: CancellationToken) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = sleep(every) => fs.append(FILE, b"chunk"),
            }
        }
    });
}

#[tokio::test]
async fn static_file_reports_stable() {
    init_tracing();
    with_timeout(async {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let gate = StabilityGate::new(Arc::new(RealFileSystem), Duration::from_millis(200));
        let started = std::time::Instant::now();
        gate.wait_for_stable(&path).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));

        assert!(gate.is_stable(&path).await);
    })
    .await;
}

#[tokio::test]
async fn growing_file_times_out_as_unstable() {
    init_tracing();
    with_timeout(async {
        let fs = MockFileSystem::new();
        fs.add_file(FILE, b"start".to_vec());

        let stop = CancellationToken::new();
        spawn_writer(fs.clone(), Duration::from_millis(20), stop.clone());

        let gate = StabilityGate::new(Arc::new(fs.clone()), Duration::from_millis(200))
            .with_timeout(Duration::from_millis(600));
        let err = gate.wait_for_stable(Path::new(FILE)).await.unwrap_err();
        stop.cancel();

        match err {
            StabilityError::Unstable { waited, .. } => {
                assert!(waited >= Duration::from_millis(600));
            }
            other => panic!("expected Unstable, got {other:?}"),
        }
    })
    .await;
}

#[tokio::test]
async fn writer_going_quiet_becomes_stable() {
    init_tracing();
    with_timeout(async {
        let fs = MockFileSystem::new();
        fs.add_file(FILE, Vec::new());

        let stop = CancellationToken::new();
        spawn_writer(fs.clone(), Duration::from_millis(20), stop.clone());

        let gate = StabilityGate::new(Arc::new(fs.clone()), Duration::from_millis(200))
            .with_timeout(Duration::from_secs(5));

        let writer_stop = stop.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(300)).await;
            writer_stop.cancel();
        });

        let started = std::time::Instant::now();
        gate.wait_for_stable(Path::new(FILE)).await.unwrap();
        // At least the writing phase plus one full quiet threshold.
        assert!(started.elapsed() >= Duration::from_millis(500));
    })
    .await;
}

#[tokio::test]
async fn recently_mutated_file_is_not_stable_on_quick_check() {
    init_tracing();
    with_timeout(async {
        let fs = MockFileSystem::new();
        fs.add_file(FILE, b"a".to_vec());

        let gate = StabilityGate::new(Arc::new(fs.clone()), Duration::from_millis(100));

        let mutator = fs.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            mutator.append(FILE, b"more");
        });

        assert!(!gate.is_stable_after(Path::new(FILE), Duration::from_millis(100)).await);
        assert!(gate.is_stable_after(Path::new(FILE), Duration::from_millis(60)).await);
    })
    .await;
}

#[tokio::test]
async fn deleted_file_is_not_found_not_unstable() {
    init_tracing();
    with_timeout(async {
        let fs = MockFileSystem::new();
        fs.add_file(FILE, b"abc".to_vec());

        let gate = StabilityGate::new(Arc::new(fs.clone()), Duration::from_millis(300));

        let remover = fs.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            remover.remove(FILE);
        });

        let err = gate.wait_for_stable(Path::new(FILE)).await.unwrap_err();
        assert!(matches!(err, StabilityError::NotFound(_)), "got {err:?}");

        // Already gone: fails straight away.
        let err = gate.wait_for_stable(Path::new(FILE)).await.unwrap_err();
        assert!(matches!(err, StabilityError::NotFound(_)), "got {err:?}");
    })
    .await;
}

#[tokio::test]
async fn cancellation_is_distinct_from_timeout() {
    init_tracing();
    with_timeout(async {
        let fs = MockFileSystem::new();
        fs.add_file(FILE, b"abc".to_vec());

        let writer_stop = CancellationToken::new();
        spawn_writer(fs.clone(), Duration::from_millis(20), writer_stop.clone());

        let gate = StabilityGate::new(Arc::new(fs.clone()), Duration::from_millis(200))
            .with_timeout(Duration::from_secs(30));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = gate
            .wait_for_stable_with(Path::new(FILE), &cancel)
            .await
            .unwrap_err();
        writer_stop.cancel();

        assert!(matches!(err, StabilityError::Cancelled(_)), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    })
    .await;
}
