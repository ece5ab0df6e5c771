// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::errors::{DropwatchError, Result};
use crate::fs::FileSystem;

/// Resolve a watch root to an absolute, canonical directory path.
///
/// Canonicalizing also gives event paths a stable prefix on platforms
/// (notably macOS) where the same directory can be reached through
/// symlinks such as `/var` → `/private/var`.
pub fn resolve_dir(fs: &dyn FileSystem, dir: &Path) -> Result<PathBuf> {
    let resolved = fs
        .canonicalize(dir)
        .map_err(|reason| DropwatchError::ResolveDir {
            path: dir.to_path_buf(),
            reason,
        })?;

    if !fs.is_dir(&resolved) {
        return Err(DropwatchError::ResolveDir {
            path: dir.to_path_buf(),
            reason: anyhow!("{:?} is not a directory", resolved),
        });
    }

    Ok(resolved)
}
