// src/logging.rs

//! Tracing subscriber setup.
//!
//! The filter is an [`EnvFilter`], so `DROPWATCH_LOG` accepts full
//! directives such as `info,dropwatch::watch=debug`. A `--log-level` flag
//! replaces it with a single global level. Output goes to stderr; stdout
//! is reserved for the dry-run listing and the session summary.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "DROPWATCH_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber. Call once, before the watcher starts.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let directives = filter_directives(cli_level, env.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("installing tracing subscriber: {err}"))?;

    tracing::debug!(directives, "logging initialised");
    Ok(())
}

/// Pick the filter directives: the CLI level wins, then a parseable
/// `DROPWATCH_LOG`, then `info`.
pub fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> &str {
    if let Some(level) = cli_level {
        return level_directive(level);
    }
    match env.map(str::trim) {
        Some(raw) if !raw.is_empty() && EnvFilter::try_new(raw).is_ok() => raw,
        _ => DEFAULT_DIRECTIVES,
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
