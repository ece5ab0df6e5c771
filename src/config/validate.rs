// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile, WatchConfig};
use crate::errors::{DropwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DropwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let watch = WatchConfig {
            debounce_delay: Duration::from_secs(raw.watch.debounce_secs),
            stability_threshold: Duration::from_millis(raw.watch.stability_threshold_ms),
            stability_timeout: Duration::from_secs(raw.watch.stability_timeout_secs),
            ignore_patterns: raw.watch.ignore,
        };
        Ok(ConfigFile::new_unchecked(raw.watch.dirs, watch, raw.handler))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_timing(cfg)?;
    validate_ignore(cfg)?;
    validate_handler(cfg)?;
    Ok(())
}

fn validate_timing(cfg: &RawConfigFile) -> Result<()> {
    let watch = &cfg.watch;
    if watch.stability_timeout_secs == 0 {
        return Err(DropwatchError::ConfigError(
            "watch.stability_timeout_secs must be at least 1".to_string(),
        ));
    }
    if watch.stability_timeout_secs.saturating_mul(1000) <= watch.stability_threshold_ms {
        return Err(DropwatchError::ConfigError(format!(
            "watch.stability_timeout_secs ({}s) must exceed watch.stability_threshold_ms ({}ms)",
            watch.stability_timeout_secs, watch.stability_threshold_ms
        )));
    }
    Ok(())
}

fn validate_ignore(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.ignore.iter().any(|p| p.trim().is_empty()) {
        return Err(DropwatchError::ConfigError(
            "watch.ignore must not contain empty patterns".to_string(),
        ));
    }
    Ok(())
}

fn validate_handler(cfg: &RawConfigFile) -> Result<()> {
    let Some(handler) = &cfg.handler else {
        return Ok(());
    };
    if handler.cmd.trim().is_empty() {
        return Err(DropwatchError::ConfigError(
            "handler.cmd must not be empty".to_string(),
        ));
    }
    if handler.review_exit_code == 0 {
        return Err(DropwatchError::ConfigError(
            "handler.review_exit_code cannot be 0 (0 means organized)".to_string(),
        ));
    }
    Ok(())
}
