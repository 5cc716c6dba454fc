//! Exclusion-aware recursive directory copy.
//!
//! `copy_if_empty` seeds a fresh project directory and never fails the caller;
//! `force_copy` is the explicit overwrite used by sync and surfaces every error.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{JugglerError, Result};

/// Legacy "recent items" lists that must not leak into an isolated config.
static RECENT_ITEMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^options/recent(Projects|Solutions|ProjectDirectories)\.xml$")
        .expect("recent-items regex must compile")
});

/// What to leave out of a mirrored tree.
#[derive(Debug, Clone, Default)]
pub struct MirrorFilter {
    /// Directory names whose whole subtree is skipped, at any depth.
    pub excluded_dirs: BTreeSet<String>,
    /// File names skipped at any depth.
    pub excluded_files: BTreeSet<String>,
    /// Matched against the source-relative path with `/` separators.
    pub excluded_path_patterns: Vec<Regex>,
}

impl MirrorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_dir(mut self, name: &str) -> Self {
        self.excluded_dirs.insert(name.to_string());
        self
    }

    pub fn exclude_file(mut self, name: &str) -> Self {
        self.excluded_files.insert(name.to_string());
        self
    }

    pub fn exclude_pattern(mut self, pattern: Regex) -> Self {
        self.excluded_path_patterns.push(pattern);
        self
    }

    /// Filter for the IDE config directory: no plugins (synced separately),
    /// no running-instance marker, no legacy recent-items lists.
    pub fn config_defaults() -> Self {
        Self::new()
            .exclude_dir("plugins")
            .exclude_file(super::INSTANCE_MARKER)
            .exclude_pattern(RECENT_ITEMS_RE.clone())
    }

    /// Filter for the plugins directory.
    pub fn plugins_defaults() -> Self {
        Self::new().exclude_file(super::INSTANCE_MARKER)
    }

    fn skips_dir(&self, name: &str) -> bool {
        self.excluded_dirs.contains(name)
    }

    fn skips_file(&self, name: &str, relative: &str) -> bool {
        self.excluded_files.contains(name)
            || self
                .excluded_path_patterns
                .iter()
                .any(|re| re.is_match(relative))
    }
}

/// Result of a best-effort population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulateOutcome {
    Copied { files: usize },
    SourceMissing,
    DestinationNotEmpty,
    Failed(String),
}

impl PopulateOutcome {
    pub fn copied(&self) -> bool {
        matches!(self, PopulateOutcome::Copied { .. })
    }
}

/// Copy `source` into `destination` only when the destination has nothing in
/// it yet. Never returns an error: failures come back as
/// [`PopulateOutcome::Failed`] and are logged.
pub fn copy_if_empty(source: &Path, destination: &Path, filter: &MirrorFilter) -> PopulateOutcome {
    if !source.is_dir() {
        debug!(source = %source.display(), "mirror source missing, skipping");
        return PopulateOutcome::SourceMissing;
    }
    match is_empty_dir(destination) {
        Ok(true) => {}
        Ok(false) => return PopulateOutcome::DestinationNotEmpty,
        Err(e) => {
            warn!(destination = %destination.display(), error = %e, "cannot inspect mirror destination");
            return PopulateOutcome::Failed(e.to_string());
        }
    }

    match copy_tree(source, destination, filter) {
        Ok(files) => {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                files,
                "populated directory"
            );
            PopulateOutcome::Copied { files }
        }
        Err(e) => {
            warn!(
                source = %source.display(),
                destination = %destination.display(),
                error = %e,
                "initial population failed; directory left as-is"
            );
            PopulateOutcome::Failed(e.to_string())
        }
    }
}

/// Replace the contents of `destination` with a filtered copy of `source`.
///
/// The destination directory itself is kept (and created if missing); only
/// its children are removed, except files the filter excludes by name (a live
/// instance keeps its marker). Returns the number of files copied.
pub fn force_copy(source: &Path, destination: &Path, filter: &MirrorFilter) -> Result<usize> {
    if !source.is_dir() {
        return Err(JugglerError::NotFound(format!(
            "source directory {}",
            source.display()
        )));
    }
    clear_dir(destination, filter).map_err(|e| copy_error(source, destination, e))?;
    copy_tree(source, destination, filter)
}

/// A missing directory counts as empty.
fn is_empty_dir(path: &Path) -> std::io::Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

fn clear_dir(path: &Path, filter: &MirrorFilter) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let child = entry.path();
        let is_dir = entry.file_type()?.is_dir();
        if !is_dir && filter.excluded_files.contains(&*entry.file_name().to_string_lossy()) {
            continue;
        }
        if is_dir {
            fs::remove_dir_all(&child)?;
        } else {
            fs::remove_file(&child)?;
        }
    }
    Ok(())
}

fn copy_tree(source: &Path, destination: &Path, filter: &MirrorFilter) -> Result<usize> {
    fs::create_dir_all(destination).map_err(|e| copy_error(source, destination, e))?;
    let mut copied = 0;
    let mut stack: Vec<(PathBuf, PathBuf)> = vec![(source.to_path_buf(), destination.to_path_buf())];

    while let Some((src_dir, dst_dir)) = stack.pop() {
        let entries = fs::read_dir(&src_dir).map_err(|e| copy_error(&src_dir, &dst_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| copy_error(&src_dir, &dst_dir, e))?;
            let src = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let dst = dst_dir.join(&name);
            // Follows symlinks, so a linked directory is copied as a directory.
            let meta = fs::metadata(&src).map_err(|e| copy_error(&src, &dst, e))?;

            if meta.is_dir() {
                if filter.skips_dir(&name) {
                    continue;
                }
                fs::create_dir_all(&dst).map_err(|e| copy_error(&src, &dst, e))?;
                stack.push((src, dst));
            } else {
                let relative = relative_slash_path(source, &src);
                if filter.skips_file(&name, &relative) {
                    continue;
                }
                fs::copy(&src, &dst).map_err(|e| copy_error(&src, &dst, e))?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn copy_error(from: &Path, to: &Path, source: std::io::Error) -> JugglerError {
    JugglerError::CopyFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}
