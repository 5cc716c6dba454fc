use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::mirror::{copy_if_empty, MirrorFilter, PopulateOutcome};
use crate::error::Result;

pub const PROJECTS_DIR: &str = "projects";
pub const OPTIONS_FILE: &str = "idea.vmoptions";
pub const METADATA_FILE: &str = "metadata.json";
pub const SIGNALS_DIR: &str = "signals";

/// Directory tree owned by one isolated project:
/// `<home>/projects/<id>/{config,system,logs,plugins}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub config: PathBuf,
    pub system: PathBuf,
    pub logs: PathBuf,
    pub plugins: PathBuf,
}

/// Where new projects are seeded from.
#[derive(Debug, Clone, Default)]
pub struct BaseDirs {
    pub config: Option<PathBuf>,
    pub plugins: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureReport {
    pub config: PopulateOutcome,
    pub plugins: PopulateOutcome,
}

impl ProjectLayout {
    pub fn for_project(home: &Path, id: &str) -> Self {
        let root = home.join(PROJECTS_DIR).join(id);
        Self {
            config: root.join("config"),
            system: root.join("system"),
            logs: root.join("logs"),
            plugins: root.join("plugins"),
            root,
        }
    }

    pub fn options_file(&self) -> PathBuf {
        self.root.join(OPTIONS_FILE)
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn signals_dir(&self) -> PathBuf {
        self.root.join(SIGNALS_DIR)
    }

    /// Create every directory and seed config and plugins from the base
    /// installation when they are still empty. Safe to call repeatedly.
    ///
    /// Config is populated before plugins; the config mirror skips plugins.
    pub fn ensure(&self, bases: &BaseDirs) -> Result<EnsureReport> {
        for dir in [&self.root, &self.config, &self.system, &self.logs, &self.plugins] {
            fs::create_dir_all(dir)?;
        }

        let config = match &bases.config {
            Some(base) => copy_if_empty(base, &self.config, &MirrorFilter::config_defaults()),
            None => PopulateOutcome::SourceMissing,
        };
        let plugins = match &bases.plugins {
            Some(base) => copy_if_empty(base, &self.plugins, &MirrorFilter::plugins_defaults()),
            None => PopulateOutcome::SourceMissing,
        };
        debug!(root = %self.root.display(), ?config, ?plugins, "project directories ready");

        Ok(EnsureReport { config, plugins })
    }

    /// Remove the whole project tree. A missing tree is not an error.
    pub fn clean(&self) -> Result<bool> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }
}
