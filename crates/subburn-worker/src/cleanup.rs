//! Temp file and session cleanup around a transcode.
//!
//! [`CleanupGuard`] is acquired before any file is written and released with
//! [`CleanupGuard::finish`] once the outcome has been reported. If the run is
//! dropped first (panic, cancelled task), `Drop` cleans up synchronously.

use std::io;
use std::path::Path;
use tracing::{debug, error, warn};

use subburn_models::{JobPaths, UserId};

use crate::session_store::SessionStore;

/// Deletes a job's local files and forgets the user's session.
#[derive(Debug, Clone)]
pub struct CleanupManager {
    sessions: SessionStore,
}

impl CleanupManager {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    /// Remove every existing job path, then clear the session.
    ///
    /// Individual delete failures are logged, never returned. Returns the
    /// number of files removed.
    pub async fn cleanup(&self, user_id: UserId, paths: &JobPaths) -> usize {
        let mut removed = 0;
        for path in paths.all() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    debug!(user_id = %user_id, path = %path.display(), "Removed temp file");
                    removed += 1;
                }
                Err(e) => log_remove_error(user_id, path, &e),
            }
        }
        self.sessions.clear(user_id);
        removed
    }

    /// Blocking variant for contexts that cannot await.
    pub fn cleanup_blocking(&self, user_id: UserId, paths: &JobPaths) -> usize {
        let mut removed = 0;
        for path in paths.all() {
            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => log_remove_error(user_id, path, &e),
            }
        }
        self.sessions.clear(user_id);
        removed
    }

    /// Acquire a guard that cleans up this job when released or dropped.
    pub fn guard(&self, user_id: UserId, paths: JobPaths) -> CleanupGuard<'_> {
        CleanupGuard {
            manager: self,
            user_id,
            paths,
            finished: false,
        }
    }
}

fn log_remove_error(user_id: UserId, path: &Path, e: &io::Error) {
    if e.kind() != io::ErrorKind::NotFound {
        error!(
            user_id = %user_id,
            path = %path.display(),
            "Failed to remove temp file: {}", e
        );
    }
}

/// Scoped cleanup for one transcode run.
pub struct CleanupGuard<'a> {
    manager: &'a CleanupManager,
    user_id: UserId,
    paths: JobPaths,
    finished: bool,
}

impl CleanupGuard<'_> {
    pub fn paths(&self) -> &JobPaths {
        &self.paths
    }

    /// Clean up on the normal path.
    pub async fn finish(mut self) -> usize {
        self.finished = true;
        self.manager.cleanup(self.user_id, &self.paths).await
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                user_id = %self.user_id,
                "CleanupGuard dropped without finish() - cleaning up synchronously"
            );
            self.manager.cleanup_blocking(self.user_id, &self.paths);
        }
    }
}
