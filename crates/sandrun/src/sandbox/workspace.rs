//! Per-execution scratch directories
//!
//! Each execution gets a uniquely named directory holding its source file.
//! The directory is removed when the [`Workspace`] is released or dropped,
//! so every exit path of the caller cleans up.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use crate::sandbox::SandboxError;

/// A scratch directory owned by a single execution
///
/// # Cleanup
///
/// [`release()`](Self::release) removes the directory and logs (but never
/// returns) removal failures. Dropping an unreleased workspace does the same,
/// which covers early returns and panics in the caller.
///
/// Async callers use [`create()`](Self::create) and [`close()`](Self::close),
/// which run the directory I/O on the blocking pool. Only the `Drop` fallback
/// removes synchronously.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a new uniquely named directory under `root`
    /// (system temp dir if `None`)
    #[instrument]
    pub fn acquire(root: Option<&Path>, prefix: &str) -> Result<Self, SandboxError> {
        let root = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&root)
            .map_err(|source| SandboxError::WorkspaceCreate {
                root: root.clone(),
                source,
            })?;
        let path = dir.path().to_path_buf();

        debug!(?path, "workspace created");

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// [`acquire()`](Self::acquire) on the blocking thread pool
    pub async fn create(root: Option<PathBuf>, prefix: String) -> Result<Self, SandboxError> {
        let parent = root.clone().unwrap_or_else(std::env::temp_dir);
        tokio::task::spawn_blocking(move || Self::acquire(root.as_deref(), &prefix))
            .await
            .map_err(|e| SandboxError::WorkspaceCreate {
                root: parent,
                source: std::io::Error::other(e),
            })?
    }

    /// Path to the workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path to a file inside the workspace
    ///
    /// Returns an error if the name would escape the workspace.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, SandboxError> {
        if name.is_empty() || name.contains("..") || name.starts_with('/') {
            return Err(SandboxError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.path.join(name))
    }

    /// Write the source text into the workspace, returning its path
    #[instrument(skip(self, source))]
    pub async fn write_source(&self, name: &str, source: &str) -> Result<PathBuf, SandboxError> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, source)
            .await
            .map_err(|source| SandboxError::WriteSource {
                path: path.clone(),
                source,
            })?;
        debug!(?path, len = source.len(), "wrote source file");
        Ok(path)
    }

    /// Remove the workspace directory
    pub fn release(mut self) {
        self.remove();
    }

    /// [`release()`](Self::release) on the blocking thread pool
    pub async fn close(self) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.release()).await {
            warn!(error = %e, "workspace removal task failed");
        }
    }

    fn remove(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => debug!(path = %self.path.display(), "workspace removed"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}
