// src/watch/stability.rs

//! Write-stability detection.
//!
//! A file is considered fully written once its size has stayed the same for
//! a configured threshold. The gate polls the size; it never opens the file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::fs::FileSystem;

/// Lower bound for the polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Overall deadline for a stability wait unless configured otherwise.
pub const DEFAULT_STABILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum StabilityError {
    /// The file does not exist (or vanished while waiting).
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    /// The size kept changing until the deadline passed.
    #[error("file {path:?} did not stabilise within {waited:?}")]
    Unstable { path: PathBuf, waited: Duration },

    /// The caller's cancellation token fired first.
    #[error("stability wait for {0:?} was cancelled")]
    Cancelled(PathBuf),

    #[error("cannot stat {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Blocks a path's processing until its writer has gone quiet.
#[derive(Debug, Clone)]
pub struct StabilityGate {
    fs: Arc<dyn FileSystem>,
    threshold: Duration,
    interval: Duration,
    timeout: Duration,
}

impl StabilityGate {
    pub fn new(fs: Arc<dyn FileSystem>, threshold: Duration) -> Self {
        Self {
            fs,
            threshold,
            interval: clamp_interval(threshold / 4),
            timeout: DEFAULT_STABILITY_TIMEOUT,
        }
    }

    /// Override the polling interval. Values below [`MIN_POLL_INTERVAL`]
    /// are raised to it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = clamp_interval(interval);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait until `path` is stable, bounded only by the configured timeout.
    pub async fn wait_for_stable(&self, path: &Path) -> Result<(), StabilityError> {
        self.wait_for_stable_with(path, &CancellationToken::new()).await
    }

    /// Wait until `path` is stable, the timeout elapses, or `cancel` fires.
    pub async fn wait_for_stable_with(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), StabilityError> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        let mut last_size = self.sample(path)?;
        let mut last_change = started;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(?path, "stability wait cancelled");
                    return Err(StabilityError::Cancelled(path.to_path_buf()));
                }
                _ = sleep_until(deadline) => {
                    return Err(StabilityError::Unstable {
                        path: path.to_path_buf(),
                        waited: started.elapsed(),
                    });
                }
                _ = sleep(self.interval) => {}
            }

            let size = self.sample(path)?;
            let now = Instant::now();

            if size != last_size {
                trace!(?path, from = last_size, to = size, "size changed");
                last_size = size;
                last_change = now;
                continue;
            }

            if now.duration_since(last_change) >= self.threshold {
                debug!(?path, size, waited = ?started.elapsed(), "file is stable");
                return Ok(());
            }
        }
    }

    /// Sample, sleep for the threshold, sample again.
    pub async fn is_stable(&self, path: &Path) -> bool {
        self.is_stable_after(path, self.threshold).await
    }

    /// Sample, sleep for `wait`, sample again. Any stat failure counts as
    /// not stable.
    pub async fn is_stable_after(&self, path: &Path, wait: Duration) -> bool {
        let Ok(before) = self.fs.file_size(path) else {
            return false;
        };
        sleep(wait).await;
        match self.fs.file_size(path) {
            Ok(after) => after == before,
            Err(_) => false,
        }
    }

    fn sample(&self, path: &Path) -> Result<u64, StabilityError> {
        self.fs.file_size(path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StabilityError::NotFound(path.to_path_buf())
            } else {
                StabilityError::Io {
                    path: path.to_path_buf(),
                    source: err,
                }
            }
        })
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_POLL_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn interval_is_quarter_threshold_with_floor() {
        let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());

        let gate = StabilityGate::new(Arc::clone(&fs), Duration::from_millis(1000));
        assert_eq!(gate.interval(), Duration::from_millis(250));

        let gate = StabilityGate::new(Arc::clone(&fs), Duration::from_millis(100));
        assert_eq!(gate.interval(), MIN_POLL_INTERVAL);

        let gate = StabilityGate::new(fs, Duration::ZERO).with_interval(Duration::from_millis(1));
        assert_eq!(gate.interval(), MIN_POLL_INTERVAL);
        assert_eq!(gate.timeout(), DEFAULT_STABILITY_TIMEOUT);
    }

    #[tokio::test]
    async fn missing_file_fails_immediately() {
        let fs = Arc::new(MockFileSystem::new());
        let gate = StabilityGate::new(fs, Duration::from_secs(5));

        let started = std::time::Instant::now();
        let err = gate.wait_for_stable(Path::new("/dl/gone.bin")).await.unwrap_err();
        assert!(matches!(err, StabilityError::NotFound(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn quick_checks_treat_missing_as_unstable() {
        let fs = Arc::new(MockFileSystem::new());
        let gate = StabilityGate::new(fs, Duration::from_millis(10));
        assert!(!gate.is_stable(Path::new("/dl/gone.bin")).await);
        assert!(!gate.is_stable_after(Path::new("/dl/gone.bin"), Duration::from_millis(1)).await);
    }
}
