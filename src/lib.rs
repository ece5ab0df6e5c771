// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod handler;
pub mod logging;
pub mod watch;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{
    default_config_path, load_from_path, load_or_default, ConfigFile, HandlerSection, RawConfigFile,
};
use crate::handler::{CommandHandler, FileHandler};
use crate::watch::{SessionSummary, Watcher, DEFAULT_IGNORE_PATTERNS};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + CLI overrides)
/// - the handler command
/// - the watcher
/// - Ctrl-C handling and the final summary
pub async fn run(args: CliArgs) -> Result<()> {
    let raw = match &args.config {
        Some(path) => load_from_path(path)
            .with_context(|| format!("loading config file {:?}", path))?,
        None => load_or_default(default_config_path())?,
    };
    let cfg = ConfigFile::try_from(apply_cli_overrides(raw, &args))?;

    if cfg.dirs().is_empty() {
        bail!("no directories to watch; pass DIR arguments or set [watch].dirs");
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let handler = cfg.handler().map(|h| {
        Arc::new(CommandHandler::new(h.cmd.clone(), h.review_exit_code)) as Arc<dyn FileHandler>
    });
    if handler.is_none() {
        warn!("no handler configured; new files will only be counted");
    }

    let mut watcher = Watcher::new(cfg.watch().clone(), handler);
    watcher.start(cfg.dirs())?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("shutdown requested");

    let summary = watcher.stop().await?;
    print_summary(&summary);
    Ok(())
}

/// Fold CLI flags into the file configuration. CLI values win; extra
/// directories and ignore globs are appended.
pub fn apply_cli_overrides(mut raw: RawConfigFile, args: &CliArgs) -> RawConfigFile {
    raw.watch.dirs.extend(args.dirs.iter().cloned());

    if let Some(secs) = args.debounce_secs {
        raw.watch.debounce_secs = secs;
    }
    if let Some(ms) = args.stability_ms {
        raw.watch.stability_threshold_ms = ms;
    }

    if !args.ignore.is_empty() {
        // Appending to an empty list must keep the defaults, not replace them.
        if raw.watch.ignore.is_empty() {
            raw.watch.ignore = DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect();
        }
        raw.watch.ignore.extend(args.ignore.iter().cloned());
    }

    if let Some(cmd) = &args.exec {
        match raw.handler.as_mut() {
            Some(handler) => handler.cmd = cmd.clone(),
            None => {
                raw.handler = Some(HandlerSection::new(cmd.clone()))
            }
        }
    }

    raw
}

fn print_dry_run(cfg: &ConfigFile) {
    let watch = cfg.watch();
    println!("dropwatch dry-run");
    println!("  dirs:");
    for dir in cfg.dirs() {
        println!("    - {}", dir.display());
    }
    println!("  debounce: {:?}", watch.debounce_delay);
    println!("  stability threshold: {:?}", watch.stability_threshold);
    println!("  stability timeout: {:?}", watch.stability_timeout);
    if watch.ignore_patterns.is_empty() {
        println!("  ignore: (defaults) {:?}", DEFAULT_IGNORE_PATTERNS);
    } else {
        println!("  ignore: {:?}", watch.ignore_patterns);
    }
    match cfg.handler() {
        Some(h) => {
            println!("  handler: {}", h.cmd);
            println!("  review exit code: {}", h.review_exit_code);
        }
        None => println!("  handler: (none, files are only counted)"),
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("dropwatch session summary");
    println!("  organized: {}", summary.files_organized);
    println!("  reviewed:  {}", summary.files_reviewed);
    println!("  skipped:   {}", summary.files_skipped);
    println!("  elapsed:   {:.1?}", summary.elapsed);
}

