use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use dropwatch::handler::{FileHandler, HandlerFuture, HandlerOutcome};

/// What the fake handler should report for a given file name.
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Outcome(HandlerOutcome),
    Fail,
}

/// A fake handler that:
/// - records every path it was given, in call order
/// - answers with a scripted outcome per file name (default: organized)
/// - optionally takes a while to answer, like a slow organizer.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    script: Arc<Mutex<HashMap<String, Scripted>>>,
    delay: Duration,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the answer for files named `file_name`.
    pub fn on(self, file_name: &str, answer: Scripted) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(file_name.to_string(), answer);
        self
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn into_handler(self) -> Arc<dyn FileHandler> {
        Arc::new(self)
    }
}

impl FileHandler for RecordingHandler {
    fn handle<'a>(&'a self, path: &'a Path) -> HandlerFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(path.to_path_buf());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let answer = self.script.lock().unwrap().get(&name).copied();

            match answer {
                None => Ok(HandlerOutcome::organized()),
                Some(Scripted::Outcome(outcome)) => Ok(outcome),
                Some(Scripted::Fail) => Err(anyhow!("scripted failure for {name}")),
            }
        })
    }
}
