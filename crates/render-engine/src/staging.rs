//! Temporary artifacts owned by one export job.
//!
//! Every path is registered before the file is created, so cleanup sees
//! partial writes too. Cleanup runs explicitly at the end of a job and again
//! on drop; the second pass finds nothing left to remove.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence for artifact names.
static ARTIFACT_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    prefix: String,
    stamp: i64,
    artifacts: Vec<PathBuf>,
}

impl StagingArea {
    /// A relative `root` is resolved against the current directory.
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: absolute(root.into()),
            prefix: prefix.into(),
            stamp: chrono::Utc::now().timestamp_millis(),
            artifacts: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a unique path `<prefix>-<purpose>-<stamp>-<seq>.<ext>`.
    pub fn allocate(&mut self, purpose: &str, extension: &str) -> PathBuf {
        let seq = ARTIFACT_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{}-{purpose}-{}-{seq}.{extension}",
            self.prefix, self.stamp
        );
        let path = self.root.join(name);
        self.artifacts.push(path.clone());
        path
    }

    /// Paths registered and not yet cleaned up.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Delete every registered artifact. Failures are logged, not returned.
    pub fn cleanup(&mut self) {
        for path in self.artifacts.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed staged file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file")
                }
            }
        }
    }
}

/// Resolve `path` against the current directory unless it is already absolute.
///
/// The concat demuxer resolves relative manifest entries against the
/// manifest's directory, so every path written into one must be absolute.
pub fn absolute(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot resolve relative path");
            path
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        self.cleanup();
    }
}
