// src/watch/stats.rs

//! Session statistics for a running watcher.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::handler::HandlerOutcome;

/// How a single file ended up being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Organized,
    Reviewed,
    Skipped,
}

impl Tally {
    /// Map a handler result onto a counter. Errors count as skipped; the
    /// first set flag wins; no flag at all is also skipped.
    pub fn from_outcome(result: &anyhow::Result<HandlerOutcome>) -> Self {
        match result {
            Err(_) => Tally::Skipped,
            Ok(outcome) if outcome.organized => Tally::Organized,
            Ok(outcome) if outcome.reviewed => Tally::Reviewed,
            Ok(_) => Tally::Skipped,
        }
    }
}

/// Immutable snapshot of a session's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub files_organized: u64,
    pub files_reviewed: u64,
    pub files_skipped: u64,
    pub elapsed: Duration,
}

impl SessionSummary {
    pub fn total(&self) -> u64 {
        self.files_organized + self.files_reviewed + self.files_skipped
    }
}

#[derive(Debug)]
struct Counters {
    organized: u64,
    reviewed: u64,
    skipped: u64,
    started_at: Instant,
}

/// Counter bundle shared between the drain loop and dispatch tasks.
///
/// All mutation and read-out goes through one mutex, so a snapshot is
/// always internally consistent.
#[derive(Debug)]
pub struct SessionStats {
    counters: Mutex<Counters>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters {
                organized: 0,
                reviewed: 0,
                skipped: 0,
                started_at: Instant::now(),
            }),
        }
    }

    /// Reset counters and restart the clock.
    pub fn restart(&self) {
        let mut c = self.lock();
        c.organized = 0;
        c.reviewed = 0;
        c.skipped = 0;
        c.started_at = Instant::now();
    }

    pub fn record(&self, tally: Tally) {
        let mut c = self.lock();
        match tally {
            Tally::Organized => c.organized += 1,
            Tally::Reviewed => c.reviewed += 1,
            Tally::Skipped => c.skipped += 1,
        }
    }

    pub fn snapshot(&self) -> SessionSummary {
        let c = self.lock();
        SessionSummary {
            files_organized: c.organized,
            files_reviewed: c.reviewed,
            files_skipped: c.skipped,
            elapsed: c.started_at.elapsed(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
