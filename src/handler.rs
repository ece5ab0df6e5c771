// src/handler.rs

//! Handler boundary.
//!
//! The watcher never decides what happens to a file; once a path is stable it
//! is handed to a [`FileHandler`], which reports whether the file was
//! organized, set aside for review, or neither.
//!
//! - [`handler_fn`] adapts a plain closure (handy in tests and embedding).
//! - [`CommandHandler`] runs an external command per file; it is what the
//!   `dropwatch` binary uses.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Result of handing one file to the handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub organized: bool,
    pub reviewed: bool,
}

impl HandlerOutcome {
    pub fn organized() -> Self {
        Self {
            organized: true,
            reviewed: false,
        }
    }

    pub fn reviewed() -> Self {
        Self {
            organized: false,
            reviewed: true,
        }
    }
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<HandlerOutcome>> + Send + 'a>>;

/// Trait abstracting what happens to a file once it is safe to touch.
///
/// Implementations may be invoked concurrently for different paths, never
/// concurrently for the same path.
pub trait FileHandler: Send + Sync {
    fn handle<'a>(&'a self, path: &'a Path) -> HandlerFuture<'a>;
}

/// Closure-backed handler, see [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FileHandler for FnHandler<F>
where
    F: Fn(&Path) -> Result<HandlerOutcome> + Send + Sync,
{
    fn handle<'a>(&'a self, path: &'a Path) -> HandlerFuture<'a> {
        Box::pin(std::future::ready((self.f)(path)))
    }
}

/// Wrap a synchronous closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn FileHandler>
where
    F: Fn(&Path) -> Result<HandlerOutcome> + Send + Sync + 'static,
{
    Arc::new(FnHandler { f })
}

/// Runs a shell command for every stable file.
///
/// The path is passed as `$1` and in the `DROPWATCH_FILE` environment
/// variable. Exit code 0 means organized, `review_exit_code` means reviewed,
/// anything else is a failure.
#[derive(Clone)]
pub struct CommandHandler {
    cmd: String,
    review_exit_code: i32,
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandler")
            .field("cmd", &self.cmd)
            .field("review_exit_code", &self.review_exit_code)
            .finish()
    }
}

impl CommandHandler {
    pub fn new(cmd: impl Into<String>, review_exit_code: i32) -> Self {
        Self {
            cmd: cmd.into(),
            review_exit_code,
        }
    }

    fn command_for(&self, path: &Path) -> Command {
        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd).arg(path);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd).arg("dropwatch").arg(path);
            c
        };

        cmd.env("DROPWATCH_FILE", path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, path: PathBuf) -> Result<HandlerOutcome> {
        debug!(cmd = %self.cmd, ?path, "running handler command");

        let output = self
            .command_for(&path)
            .output()
            .await
            .with_context(|| format!("spawning handler command for {:?}", path))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(?path, "[handler] {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(?path, "[handler] {}", line);
        }

        match output.status.code() {
            Some(0) => Ok(HandlerOutcome::organized()),
            Some(code) if code == self.review_exit_code => Ok(HandlerOutcome::reviewed()),
            _ => Err(anyhow!(
                "handler command failed for {:?}: {}",
                path,
                output.status
            )),
        }
    }
}

impl FileHandler for CommandHandler {
    fn handle<'a>(&'a self, path: &'a Path) -> HandlerFuture<'a> {
        Box::pin(self.run(path.to_path_buf()))
    }
}
