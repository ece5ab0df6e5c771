// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DropwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("cannot resolve watch directory {path:?}: {reason:#}")]
    ResolveDir { path: PathBuf, reason: anyhow::Error },

    #[error("cannot watch directory {path:?}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("watcher has already been started")]
    AlreadyStarted,

    #[error("watcher is not running")]
    NotRunning,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DropwatchError>;
