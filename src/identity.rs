use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

/// Number of hex characters kept from the path hash.
const ID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    pub canonical_path: PathBuf,
    pub id: String,
}

/// First 16 lowercase hex characters of the SHA-256 of `path` as given.
/// No canonicalisation happens here; [`ProjectIdentity::identify`] does that.
pub fn compute_project_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..ID_LEN / 2])
}

/// Resolve `path` to its canonical form.
///
/// Existing paths have their symlinks resolved. Anything else is made absolute
/// against the current directory and normalized lexically, so this never fails.
pub fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_lexically(&absolute)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl ProjectIdentity {
    /// Derive the identity of the project at `path`.
    ///
    /// `~` and `$HOME` prefixes are expected to be expanded by the caller
    /// (see [`crate::platform::expand_home`]).
    pub fn identify(path: &Path) -> Self {
        let canonical_path = canonicalize_lenient(path);
        let id = compute_project_id(&canonical_path);
        Self { canonical_path, id }
    }

    /// Last path component, used as the display name of a project.
    pub fn display_name(&self) -> String {
        self.canonical_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.canonical_path.to_string_lossy().to_string())
    }
}
