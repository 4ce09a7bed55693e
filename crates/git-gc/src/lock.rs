//! Exclusive repository lock around the prune step.
//!
//! Concurrent GC runs racing the same prune step could disagree on what
//! is reachable between their snapshot and their sweep; a pid-file lock
//! in the git directory serializes them. Every other GC phase (repack,
//! deltify) is safe to run alongside readers and writers without this
//! lock, per the core's concurrency model.

use std::path::{Path, PathBuf};

use crate::GcError;

/// RAII guard holding `<git-dir>/gc.pid`. Dropped (or consumed) removes
/// the lock file.
pub struct GcLock {
    path: PathBuf,
}

impl GcLock {
    /// Acquire the lock, failing unless `force` is set or no lock is held.
    pub fn acquire(git_dir: &Path, force: bool) -> Result<Self, GcError> {
        let path = git_dir.join("gc.pid");
        if path.exists() && !force {
            let pid = std::fs::read_to_string(&path).unwrap_or_default();
            return Err(GcError::AlreadyRunning(pid.trim().to_string()));
        }
        std::fs::write(&path, format!("{}", std::process::id()))?;
        Ok(Self { path })
    }
}

impl Drop for GcLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
