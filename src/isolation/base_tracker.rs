use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::ConfigRepository;
use crate::error::Result;

/// SHA-256 of a file's raw bytes, hex encoded.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Detects edits to the base options file since the last sync.
#[derive(Debug, Clone)]
pub struct BaseChangeTracker {
    config: Arc<ConfigRepository>,
}

impl BaseChangeTracker {
    pub fn new(config: Arc<ConfigRepository>) -> Self {
        Self { config }
    }

    /// True when the configured base file exists and its hash differs from
    /// the stored one (including when nothing was stored yet).
    pub fn has_changed(&self) -> Result<bool> {
        let state = self.config.snapshot().base_vm_options;
        let Some(path) = state.path.filter(|p| p.is_file()) else {
            return Ok(false);
        };
        let current = hash_file(&path)?;
        let changed = state.content_hash.as_deref() != Some(current.as_str());
        debug!(path = %path.display(), changed, "checked base options file");
        Ok(changed)
    }

    /// Record the current hash of the base file. No-op when nothing is
    /// configured or the file is gone.
    pub fn update_hash(&self) -> Result<()> {
        let state = self.config.snapshot().base_vm_options;
        let Some(path) = state.path.filter(|p| p.is_file()) else {
            return Ok(());
        };
        let current = hash_file(&path)?;
        self.config
            .update(|c| c.base_vm_options.content_hash = Some(current))?;
        Ok(())
    }
}
