// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::watch::stability::DEFAULT_STABILITY_TIMEOUT;

/// Effective pipeline settings, fixed for the lifetime of a running
/// watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Quiet period after the last notification before a path is dispatched.
    pub debounce_delay: Duration,
    /// How long a file's size must stay unchanged to count as written.
    pub stability_threshold: Duration,
    /// Upper bound on a single stability wait.
    pub stability_timeout: Duration,
    /// Ignore globs; empty means the built-in defaults.
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_secs(default_debounce_secs()),
            stability_threshold: Duration::from_millis(default_stability_threshold_ms()),
            stability_timeout: DEFAULT_STABILITY_TIMEOUT,
            ignore_patterns: Vec::new(),
        }
    }
}

/// Validated configuration. Build via `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    dirs: Vec<PathBuf>,
    watch: WatchConfig,
    handler: Option<HandlerSection>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        dirs: Vec<PathBuf>,
        watch: WatchConfig,
        handler: Option<HandlerSection>,
    ) -> Self {
        Self {
            dirs,
            watch,
            handler,
        }
    }

    /// Directories to watch.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn watch(&self) -> &WatchConfig {
        &self.watch
    }

    pub fn handler(&self) -> Option<&HandlerSection> {
        self.handler.as_ref()
    }
}

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// dirs = ["/home/me/Downloads"]
/// debounce_secs = 2
/// stability_threshold_ms = 1000
/// stability_timeout_secs = 30
/// ignore = ["*.part", ".tmp"]
///
/// [handler]
/// cmd = "organize \"$1\""
/// review_exit_code = 10
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    /// External command that receives each stable file. Without it, files
    /// are only counted.
    #[serde(default)]
    pub handler: Option<HandlerSection>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(default)]
    pub dirs: Vec<PathBuf>,

    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,

    #[serde(default = "default_stability_threshold_ms")]
    pub stability_threshold_ms: u64,

    #[serde(default = "default_stability_timeout_secs")]
    pub stability_timeout_secs: u64,

    /// Ignore globs. Empty or absent means the built-in defaults.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_debounce_secs() -> u64 {
    2
}

fn default_stability_threshold_ms() -> u64 {
    1000
}

fn default_stability_timeout_secs() -> u64 {
    DEFAULT_STABILITY_TIMEOUT.as_secs()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            debounce_secs: default_debounce_secs(),
            stability_threshold_ms: default_stability_threshold_ms(),
            stability_timeout_secs: default_stability_timeout_secs(),
            ignore: Vec::new(),
        }
    }
}

/// `[handler]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HandlerSection {
    /// Shell command; the file path is `$1` and `DROPWATCH_FILE`.
    pub cmd: String,

    /// Exit code meaning "set aside for manual review".
    #[serde(default = "default_review_exit_code")]
    pub review_exit_code: i32,
}

impl HandlerSection {
    /// Handler running `cmd` with the default review exit code.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            review_exit_code: default_review_exit_code(),
        }
    }
}

fn default_review_exit_code() -> i32 {
    10
}
