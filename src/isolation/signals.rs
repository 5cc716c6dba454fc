//! File-based coordination with other processes working on the same project.
//!
//! Two primitives share `<project>/signals/`:
//!
//! * `sync-in-progress.lock` carries an advisory exclusive lock for the
//!   duration of one sync, so a second `juggler sync` on the same project
//!   fails fast instead of interleaving copies.
//! * `stop-request.json` tells the running IDE instance (through its own
//!   shutdown hook) that a sync wants it to exit.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ProjectLayout;
use crate::error::Result;

pub const SYNC_LOCK_FILE: &str = "sync-in-progress.lock";
pub const STOP_REQUEST_FILE: &str = "stop-request.json";

/// Request for a running instance to shut down so its directories can be
/// rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub requested_by: String,
    pub auto_restart: bool,
    pub sync_types: Vec<String>,
    pub timeout_seconds: u64,
}

impl StopRequest {
    pub fn new(auto_restart: bool, sync_types: Vec<String>, timeout_seconds: u64) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            requested_by: format!("juggler (pid {})", std::process::id()),
            auto_restart,
            sync_types,
            timeout_seconds,
        }
    }
}

/// Outcome of trying to take the sync lock.
#[must_use]
#[derive(Debug)]
pub enum LockAcquisition {
    Acquired(SyncLock),
    AlreadyHeld,
}

/// Held sync lock. Released (unlocked, closed, file removed) on drop.
#[derive(Debug)]
pub struct SyncLock {
    file: Option<File>,
    path: PathBuf,
}

impl SyncLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                warn!(path = %self.path.display(), error = %e, "failed to unlock sync lock");
            }
            drop(file);
            let _ = fs::remove_file(&self.path);
            debug!(path = %self.path.display(), "released sync lock");
        }
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// The `signals/` directory of one project.
#[derive(Debug, Clone)]
pub struct SignalDir {
    dir: PathBuf,
}

impl SignalDir {
    pub fn for_layout(layout: &ProjectLayout) -> Self {
        Self {
            dir: layout.signals_dir(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Try to take the exclusive sync lock. Contention is not an error.
    ///
    /// A lock won on a file the previous holder already unlinked guards
    /// nothing, so the path is reopened once before giving up.
    pub fn acquire_sync_lock(&self) -> Result<LockAcquisition> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(SYNC_LOCK_FILE);

        for _ in 0..2 {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false) // never clobber the holder's pid before we own the lock
                .open(&path)?;

            match lock_current(file, &path)? {
                LockAttempt::Locked(mut file) => {
                    file.set_len(0)?;
                    writeln!(file, "{}", std::process::id())?;
                    debug!(path = %path.display(), "acquired sync lock");
                    return Ok(LockAcquisition::Acquired(SyncLock {
                        file: Some(file),
                        path,
                    }));
                }
                LockAttempt::Contended => {
                    debug!(path = %path.display(), "sync lock held elsewhere");
                    return Ok(LockAcquisition::AlreadyHeld);
                }
                LockAttempt::Unlinked => {
                    debug!(path = %path.display(), "lock file replaced while locking, retrying");
                }
            }
        }
        Ok(LockAcquisition::AlreadyHeld)
    }

    pub fn stop_request_path(&self) -> PathBuf {
        self.dir.join(STOP_REQUEST_FILE)
    }

    pub fn write_stop_request(&self, request: &StopRequest) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.stop_request_path();
        let content = serde_json::to_string_pretty(request)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &content)?;
        fs::rename(&tmp_path, &path)?;
        debug!(path = %path.display(), request_id = %request.request_id, "wrote stop request");
        Ok(path)
    }

    pub fn read_stop_request(&self) -> Option<StopRequest> {
        let content = fs::read_to_string(self.stop_request_path()).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Remove every signal file. The sync lock file is left to its guard,
    /// which deletes it on release.
    pub fn cleanup(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            if entry.file_name() == SYNC_LOCK_FILE {
                continue;
            }
            let path = entry.path();
            if path.is_file() && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Delete a stop request older than `max_age_minutes`. Unreadable or
    /// unparsable requests count as stale. Returns whether one was removed.
    pub fn cleanup_stale(&self, max_age_minutes: u64) -> bool {
        let path = self.stop_request_path();
        if !path.exists() {
            return false;
        }
        let cutoff = Utc::now() - chrono::Duration::minutes(max_age_minutes as i64);
        let stale = match self.read_stop_request() {
            Some(request) => request.timestamp < cutoff,
            None => true,
        };
        if stale {
            debug!(path = %path.display(), "removing stale stop request");
            return fs::remove_file(&path).is_ok();
        }
        false
    }
}

enum LockAttempt {
    Locked(File),
    Contended,
    /// Locked, but the handle no longer names the file at the lock path.
    Unlinked,
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn lock_current(file: File, path: &Path) -> std::io::Result<LockAttempt> {
    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {}
        Err(e) if is_contended(&e) => return Ok(LockAttempt::Contended),
        Err(e) => return Err(e),
    }
    let current = match fs::metadata(path) {
        Ok(on_disk) => same_file(&file.metadata()?, &on_disk),
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };
    if current {
        Ok(LockAttempt::Locked(file))
    } else {
        // Dropping the handle releases the lock on the orphaned inode.
        Ok(LockAttempt::Unlinked)
    }
}

#[cfg(unix)]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

// Windows refuses to delete a file another handle has open, so the lock
// path cannot be swapped out from under a holder.
#[cfg(not(unix))]
fn same_file(_: &fs::Metadata, _: &fs::Metadata) -> bool {
    true
}
