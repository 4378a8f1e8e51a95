//! Request-scoped staging of downloaded bands.
//!
//! Every remote-mode request gets its own directory `req-<request_id>-XXXX`
//! under the staging root. The directory and everything in it is removed when
//! the `RequestStaging` guard is closed or dropped, including on early return
//! and unwind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use uuid::Uuid;

/// Prefix shared by every request directory; used by the startup sweep.
pub const STAGING_PREFIX: &str = "req-";

/// Request directories younger than this are presumed live (possibly owned
/// by another process sharing the root) and left alone by the sweep.
/// Must exceed the longest remote request: five downloads at the transfer
/// timeout plus gateway calls.
pub const ORPHAN_MIN_AGE: Duration = Duration::from_secs(60 * 60);

pub struct RequestStaging {
    request_id: Uuid,
    dir: Option<TempDir>,
}

impl RequestStaging {
    /// Create the request directory under `root` (created if absent).
    pub fn create(root: &Path, request_id: Uuid) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{STAGING_PREFIX}{request_id}-"))
            .tempdir_in(root)?;
        tracing::debug!(%request_id, "Staging directory created");
        Ok(Self {
            request_id,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Local destination for band `position`.
    pub fn band_file(&self, position: usize, extension: &str) -> PathBuf {
        self.path().join(format!("band{position}.{extension}"))
    }

    /// Remove the directory now, reporting failure.
    pub fn close(mut self) -> std::io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                dir.close()?;
                tracing::debug!(request_id = %self.request_id, "Staging directory removed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for RequestStaging {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(request_id = %self.request_id, error = %e, "Failed to remove staging directory");
            } else {
                tracing::debug!(request_id = %self.request_id, "Staging directory removed on drop");
            }
        }
    }
}

/// Remove request directories left behind by crashed processes.
///
/// Only directories whose mtime is at least `min_age` old are removed, so
/// in-flight requests of other processes sharing `root` survive. Returns
/// the number of directories removed.
pub fn cleanup_orphaned_staging(root: &Path, min_age: Duration) -> usize {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    let mut skipped = 0;
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) if m.is_dir() => m,
            _ => continue,
        };
        // Future or unreadable mtimes count as fresh.
        let age = metadata
            .modified()
            .ok()
            .and_then(|t| t.elapsed().ok())
            .unwrap_or(Duration::ZERO);
        if age < min_age {
            skipped += 1;
            continue;
        }
        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(error = %e, "Failed to remove orphaned staging directory"),
        }
    }

    if removed > 0 || skipped > 0 {
        tracing::info!(removed, skipped, "Swept orphaned staging directories");
    }
    removed
}
