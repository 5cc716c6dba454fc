//! Per-project isolation: directory tree, options file and the signal files
//! used to coordinate with a running IDE instance.

pub mod base_tracker;
pub mod layout;
pub mod mirror;
pub mod options;
pub mod signals;

use std::path::{Path, PathBuf};

pub use layout::ProjectLayout;

/// File the IDE keeps in its config directory while it is running.
pub const INSTANCE_MARKER: &str = ".lock";

/// Location of the running-instance marker for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceMarker {
    path: PathBuf,
}

impl InstanceMarker {
    /// Marker inside an isolated project's config directory.
    pub fn for_layout(layout: &ProjectLayout) -> Self {
        Self::in_config_dir(&layout.config)
    }

    /// Marker inside an arbitrary config directory (the base config for the
    /// main project).
    pub fn in_config_dir(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(INSTANCE_MARKER),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_present(&self) -> bool {
        self.path.exists()
    }

    /// PID written by the IDE into the marker, if it is a plain integer.
    pub fn read_pid(&self) -> Option<u32> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        content.trim().parse().ok()
    }
}
