use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::state::ProjectMetadata;
use crate::error::Result;
use crate::identity::ProjectIdentity;
use crate::isolation::layout::PROJECTS_DIR;
use crate::isolation::ProjectLayout;

/// All tracked projects under one juggler home, discovered from
/// `projects/*/metadata.json`.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    home: PathBuf,
}

impl ProjectRegistry {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn layout(&self, id: &str) -> ProjectLayout {
        ProjectLayout::for_project(&self.home, id)
    }

    pub fn load(&self, id: &str) -> Option<ProjectMetadata> {
        ProjectMetadata::load(&self.layout(id).root)
    }

    pub fn record_open(&self, identity: &ProjectIdentity) -> Result<ProjectMetadata> {
        ProjectMetadata::record_open(&self.layout(&identity.id).root, identity)
    }

    /// Every tracked project, most recently opened first. Directories without
    /// readable metadata are skipped.
    pub fn list(&self) -> Result<Vec<ProjectMetadata>> {
        let dir = self.home.join(PROJECTS_DIR);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut projects: Vec<ProjectMetadata> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| ProjectMetadata::load(&entry.path()))
            .collect();
        projects.sort_by(|a, b| b.last_opened_at.cmp(&a.last_opened_at));
        Ok(projects)
    }

    /// Debug ports held by every project except `exclude_id`.
    pub fn used_ports(&self, exclude_id: &str) -> Result<HashSet<u16>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|p| p.id != exclude_id)
            .filter_map(|p| p.debug_port)
            .collect())
    }

    /// Look a project up by path, or by a unique prefix of its id.
    pub fn find(&self, query: &str) -> Result<Option<ProjectMetadata>> {
        let as_path = crate::platform::resolve_user_path(Path::new(query));
        let identity = ProjectIdentity::identify(&as_path);
        if let Some(meta) = self.load(&identity.id) {
            return Ok(Some(meta));
        }

        if query.is_empty() || !query.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(None);
        }
        let mut matches: Vec<ProjectMetadata> = self
            .list()?
            .into_iter()
            .filter(|p| p.id.starts_with(query))
            .collect();
        if matches.len() == 1 {
            Ok(matches.pop())
        } else {
            debug!(query, candidates = matches.len(), "id prefix is not unique");
            Ok(None)
        }
    }

    /// Projects whose directory on disk no longer exists.
    pub fn stale(&self) -> Result<Vec<ProjectMetadata>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|p| !p.path.exists())
            .collect())
    }

    /// Delete a project's whole tree, metadata included.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.layout(id).clean()?;
        if removed {
            info!(id, "removed project");
        }
        Ok(removed)
    }
}
