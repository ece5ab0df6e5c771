// src/watch/mod.rs

//! File watching and the new-file pipeline.
//!
//! This module is responsible for:
//! - Filtering out transient files by name (`patterns`).
//! - Coalescing bursts of notifications per path (`debounce`).
//! - Waiting until a file's writer has gone quiet (`stability`).
//! - Wiring a cross-platform filesystem watcher (`notify`) through the above
//!   into a handler and counting the outcomes (`watcher`, `stats`).
//!
//! It does **not** decide where files go; that is the handler's job.

pub mod debounce;
pub mod path_utils;
pub mod patterns;
pub mod stability;
pub mod stats;
pub mod watcher;

pub use debounce::{DebounceCallback, Debouncer, DispatchFuture};
pub use patterns::{IgnoreFilter, DEFAULT_IGNORE_PATTERNS};
pub use stability::{StabilityError, StabilityGate, DEFAULT_STABILITY_TIMEOUT, MIN_POLL_INTERVAL};
pub use stats::{SessionStats, SessionSummary, Tally};
pub use watcher::{Watcher, WatcherState};
