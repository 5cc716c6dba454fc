use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::Result;
use crate::identity::ProjectIdentity;
use crate::isolation::layout::METADATA_FILE;

/// Persisted record of one tracked project, stored as
/// `projects/<id>/metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub path: PathBuf,
    pub id: String,
    pub name: String,
    pub last_opened_at: DateTime<Utc>,
    #[serde(default)]
    pub open_count: u64,
    #[serde(default)]
    pub debug_port: Option<u16>,
}

impl ProjectMetadata {
    pub fn new(identity: &ProjectIdentity) -> Self {
        Self {
            path: identity.canonical_path.clone(),
            id: identity.id.clone(),
            name: identity.display_name(),
            last_opened_at: Utc::now(),
            open_count: 0,
            debug_port: None,
        }
    }

    pub fn save(&self, project_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(project_dir)?;
        let path = project_dir.join(METADATA_FILE);
        let content = serde_json::to_string_pretty(self)?;
        // Atomic write: write to tmp file then rename
        let tmp_path = project_dir.join("metadata.json.tmp");
        std::fs::write(&tmp_path, &content)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn load(project_dir: &Path) -> Option<Self> {
        let path = project_dir.join(METADATA_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Acquire an exclusive file lock on metadata.json.lock.
    /// Returns the lock file handle (lock released on drop).
    fn lock_metadata(project_dir: &Path) -> Result<File> {
        std::fs::create_dir_all(project_dir)?;
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(project_dir.join("metadata.json.lock"))?;
        lock_file.lock_exclusive()?;
        Ok(lock_file)
    }

    /// Atomically load-or-create the metadata for `identity` and record an
    /// open: count bumped, timestamp refreshed, debug port kept.
    pub fn record_open(project_dir: &Path, identity: &ProjectIdentity) -> Result<Self> {
        let _lock = Self::lock_metadata(project_dir)?;
        let mut meta = Self::load(project_dir).unwrap_or_else(|| Self::new(identity));
        meta.path = identity.canonical_path.clone();
        meta.open_count += 1;
        meta.last_opened_at = Utc::now();
        meta.save(project_dir)?;
        Ok(meta)
    }

    /// Atomically set the debug port unless one is already stored, and return
    /// the port that ends up persisted.
    pub fn assign_debug_port(project_dir: &Path, port: u16) -> Result<Option<u16>> {
        let _lock = Self::lock_metadata(project_dir)?;
        let Some(mut meta) = Self::load(project_dir) else {
            return Ok(None);
        };
        if meta.debug_port.is_none() {
            meta.debug_port = Some(port);
            meta.save(project_dir)?;
        }
        Ok(meta.debug_port)
    }
}
