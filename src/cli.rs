// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dropwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dropwatch",
    version,
    about = "Hand newly created files to an organizer once they are fully written.",
    long_about = None
)]
pub struct CliArgs {
    /// Directories to watch, in addition to `[watch].dirs` from the config.
    #[arg(value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// If omitted, `Dropwatch.toml` in the current directory is used when it
    /// exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Quiet period (seconds) after the last event before a file is handled.
    #[arg(long, value_name = "SECS")]
    pub debounce_secs: Option<u64>,

    /// How long (milliseconds) a file's size must stay unchanged.
    #[arg(long, value_name = "MS")]
    pub stability_ms: Option<u64>,

    /// Extra ignore glob; may be repeated. Appended to the configured list.
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Handler command run for each file (`$1` is the file path).
    #[arg(long, value_name = "CMD")]
    pub exec: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DROPWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the effective configuration and exit without watching.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
