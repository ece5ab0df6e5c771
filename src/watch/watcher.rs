// src/watch/watcher.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::errors::{DropwatchError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::handler::FileHandler;
use crate::watch::debounce::{DebounceCallback, Debouncer, DispatchFuture};
use crate::watch::path_utils::resolve_dir;
use crate::watch::patterns::IgnoreFilter;
use crate::watch::stability::{StabilityError, StabilityGate};
use crate::watch::stats::{SessionStats, SessionSummary, Tally};

/// Lifecycle of a [`Watcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Stopped,
}

/// Coordinates the pipeline for a set of watched directories:
/// notification → ignore filter → debounce → stability → handler → stats.
pub struct Watcher {
    config: WatchConfig,
    filter: Arc<IgnoreFilter>,
    handler: Option<Arc<dyn FileHandler>>,
    fs: Arc<dyn FileSystem>,
    stats: Arc<SessionStats>,
    state: State,
}

enum State {
    Idle,
    Running(Box<RunningWatch>),
    Stopped(SessionSummary),
}

/// Everything owned while the watch is active.
struct RunningWatch {
    roots: Vec<PathBuf>,
    /// Dropping this closes the OS subscription.
    notify: RecommendedWatcher,
    stop: CancellationToken,
    event_loop: JoinHandle<()>,
    debouncer: Debouncer,
    dispatcher: Arc<Dispatcher>,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Build an idle watcher. `handler = None` is allowed and counts every
    /// accepted file as organized.
    pub fn new(config: WatchConfig, handler: Option<Arc<dyn FileHandler>>) -> Self {
        let filter = Arc::new(IgnoreFilter::new(&config.ignore_patterns));
        Self {
            config,
            filter,
            handler,
            fs: Arc::new(RealFileSystem),
            stats: Arc::new(SessionStats::new()),
            state: State::Idle,
        }
    }

    /// Replace the filesystem used for directory resolution, directory
    /// checks and size sampling.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn filter(&self) -> &IgnoreFilter {
        &self.filter
    }

    pub fn state(&self) -> WatcherState {
        match self.state {
            State::Idle => WatcherState::Idle,
            State::Running(_) => WatcherState::Running,
            State::Stopped(_) => WatcherState::Stopped,
        }
    }

    /// Absolute roots currently being watched (empty unless running).
    pub fn roots(&self) -> &[PathBuf] {
        match &self.state {
            State::Running(running) => &running.roots,
            _ => &[],
        }
    }

    /// Consistent snapshot of the counters. After [`stop`](Self::stop) this
    /// is the frozen final summary.
    pub fn summary(&self) -> SessionSummary {
        match &self.state {
            State::Stopped(summary) => *summary,
            _ => self.stats.snapshot(),
        }
    }

    /// Subscribe to `dirs` and start processing.
    ///
    /// Every directory is resolved to an absolute path first. If any of them
    /// cannot be resolved or watched, nothing stays subscribed and the error
    /// is returned. Must be called from within a tokio runtime.
    pub fn start<P: AsRef<Path>>(&mut self, dirs: &[P]) -> Result<()> {
        if !matches!(self.state, State::Idle) {
            return Err(DropwatchError::AlreadyStarted);
        }

        let roots = dirs
            .iter()
            .map(|dir| resolve_dir(self.fs.as_ref(), dir.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        // Channel from the blocking notify callback into the async world.
        // Errors travel on the same stream so the loop can log them.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut notify = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver only goes away during shutdown.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )
        .map_err(|err| {
            DropwatchError::Other(anyhow::Error::from(err).context("creating filesystem watcher"))
        })?;

        // On error `notify` is dropped here, tearing down roots already added.
        for root in &roots {
            notify
                .watch(root, RecursiveMode::NonRecursive)
                .map_err(|source| DropwatchError::Subscribe {
                    path: root.clone(),
                    source,
                })?;
        }

        self.stats.restart();

        let gate = StabilityGate::new(Arc::clone(&self.fs), self.config.stability_threshold)
            .with_timeout(self.config.stability_timeout);

        let dispatcher = Arc::new(Dispatcher {
            gate,
            handler: self.handler.clone(),
            stats: Arc::clone(&self.stats),
            in_flight: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        });

        let callback: DebounceCallback = {
            let dispatcher = Arc::clone(&dispatcher);
            Arc::new(move |path: PathBuf| -> DispatchFuture {
                Box::pin(Arc::clone(&dispatcher).dispatch(path))
            })
        };
        let debouncer = Debouncer::new(self.config.debounce_delay, Some(callback));

        let stop = CancellationToken::new();
        let event_loop = tokio::spawn(run_event_loop(
            event_rx,
            stop.clone(),
            EventContext {
                filter: Arc::clone(&self.filter),
                fs: Arc::clone(&self.fs),
                debouncer: debouncer.clone(),
                stats: Arc::clone(&self.stats),
            },
        ));

        info!(?roots, "file watcher started");

        self.state = State::Running(Box::new(RunningWatch {
            roots,
            notify,
            stop,
            event_loop,
            debouncer,
            dispatcher,
        }));
        Ok(())
    }

    /// Stop watching and return the final summary.
    ///
    /// Order: stop the event loop and wait for it, close the subscription,
    /// cancel pending debounce timers, cancel stability waits and wait for
    /// in-flight dispatches, then read the counters. Nothing is counted
    /// after this returns.
    pub async fn stop(&mut self) -> Result<SessionSummary> {
        let running = match std::mem::replace(&mut self.state, State::Idle) {
            State::Running(running) => running,
            other => {
                self.state = other;
                return Err(DropwatchError::NotRunning);
            }
        };

        let RunningWatch {
            roots,
            notify,
            stop,
            event_loop,
            debouncer,
            dispatcher,
        } = *running;

        stop.cancel();
        if let Err(err) = event_loop.await {
            warn!(error = %err, "event loop task ended abnormally");
        }

        drop(notify);

        debouncer.cancel_all();
        dispatcher.cancel.cancel();
        debouncer.drain().await;

        let summary = self.stats.snapshot();
        info!(
            ?roots,
            organized = summary.files_organized,
            reviewed = summary.files_reviewed,
            skipped = summary.files_skipped,
            elapsed = ?summary.elapsed,
            "file watcher stopped"
        );

        self.state = State::Stopped(summary);
        Ok(summary)
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let State::Running(running) = &self.state {
            running.stop.cancel();
            running.debouncer.cancel_all();
            running.dispatcher.cancel.cancel();
        }
    }
}

/// State shared by the event loop.
struct EventContext {
    filter: Arc<IgnoreFilter>,
    fs: Arc<dyn FileSystem>,
    debouncer: Debouncer,
    stats: Arc<SessionStats>,
}

impl EventContext {
    fn handle_event(&self, event: Event) {
        for path in created_paths(&event) {
            if self.fs.is_dir(&path) {
                debug!(?path, "ignoring new directory");
                continue;
            }
            if self.filter.should_ignore(&path) {
                debug!(?path, "matches ignore pattern; skipping");
                self.stats.record(Tally::Skipped);
                continue;
            }
            debug!(?path, "new file; scheduling dispatch");
            self.debouncer.add(path);
        }
    }
}

/// Drain notifications one at a time until `stop` fires or the sender side
/// goes away.
async fn run_event_loop(
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    stop: CancellationToken,
    ctx: EventContext,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            msg = event_rx.recv() => match msg {
                Some(Ok(event)) => {
                    debug!(?event, "received notify event");
                    ctx.handle_event(event);
                }
                Some(Err(err)) => {
                    warn!(error = %err, "file watch error; still watching");
                }
                None => break,
            },
        }
    }
    debug!("watcher event loop finished");
}

/// Paths that newly appeared in a watched directory.
///
/// A rename into the directory counts as a creation: browsers finish a
/// download by renaming the partial file.
fn created_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1).cloned().into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// Runs the stability wait and the handler for one debounced path.
struct Dispatcher {
    gate: StabilityGate,
    handler: Option<Arc<dyn FileHandler>>,
    stats: Arc<SessionStats>,
    /// Paths being dispatched, flagged when another firing arrived meanwhile.
    in_flight: Mutex<HashMap<PathBuf, bool>>,
    /// Fired at shutdown to abandon stability waits.
    cancel: CancellationToken,
}

impl Dispatcher {
    async fn dispatch(self: Arc<Self>, path: PathBuf) {
        if !self.begin(&path) {
            debug!(?path, "dispatch already in progress; will run again after it");
            return;
        }

        loop {
            if let Some(tally) = self.process(&path).await {
                self.stats.record(tally);
            }
            if !self.finish(&path) {
                break;
            }
            debug!(?path, "path fired again while busy; dispatching once more");
        }
    }

    async fn process(&self, path: &Path) -> Option<Tally> {
        match self.gate.wait_for_stable_with(path, &self.cancel).await {
            Ok(()) => {}
            Err(StabilityError::Cancelled(_)) => return None,
            Err(err) => {
                warn!(?path, error = %err, "file not ready; skipping");
                return Some(Tally::Skipped);
            }
        }

        let Some(handler) = &self.handler else {
            debug!(?path, "no handler registered; counting as organized");
            return Some(Tally::Organized);
        };

        let result = handler.handle(path).await;
        match &result {
            Ok(outcome) => debug!(?path, ?outcome, "handler finished"),
            Err(err) => warn!(?path, error = %err, "handler failed; skipping"),
        }
        Some(Tally::from_outcome(&result))
    }

    /// Claim `path`. If it is already claimed, ask the owner for one more
    /// round instead and return `false`.
    fn begin(&self, path: &Path) -> bool {
        let mut in_flight = self.lock_in_flight();
        match in_flight.get_mut(path) {
            Some(rerun) => {
                *rerun = true;
                false
            }
            None => {
                in_flight.insert(path.to_path_buf(), false);
                true
            }
        }
    }

    /// Release `path`, or keep it and return `true` when a rerun was
    /// requested. Shutdown discards pending reruns.
    fn finish(&self, path: &Path) -> bool {
        let mut in_flight = self.lock_in_flight();
        let rerun = in_flight.get(path).copied().unwrap_or(false);
        if rerun && !self.cancel.is_cancelled() {
            in_flight.insert(path.to_path_buf(), false);
            return true;
        }
        in_flight.remove(path);
        false
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<PathBuf, bool>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
