pub mod resolve;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CONFIG_FILE: &str = "config.json";

const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 60;

fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

/// Base options file plus the content hash recorded at the last sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseOptionsState {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub content_hash: Option<String>,
}

/// Global settings shared by every tracked project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JugglerConfig {
    /// IDE launcher executable.
    #[serde(default)]
    pub idea_path: Option<PathBuf>,
    #[serde(default)]
    pub base_vm_options: BaseOptionsState,
    /// The IDE's own config directory, used as the template for new projects.
    #[serde(default)]
    pub base_config_path: Option<PathBuf>,
    #[serde(default)]
    pub base_plugins_path: Option<PathBuf>,
    /// Project that bypasses isolation.
    #[serde(default)]
    pub main_project: Option<PathBuf>,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for JugglerConfig {
    fn default() -> Self {
        Self {
            idea_path: None,
            base_vm_options: BaseOptionsState::default(),
            base_config_path: None,
            base_plugins_path: None,
            main_project: None,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

/// Single access point for the global configuration file.
///
/// Every read and write goes through the in-memory copy behind the mutex, and
/// every write is persisted with a tmp-file + rename so a crash never leaves a
/// truncated `config.json` behind.
#[derive(Debug)]
pub struct ConfigRepository {
    path: PathBuf,
    state: Mutex<JugglerConfig>,
}

impl ConfigRepository {
    /// Load `<home>/config.json`, falling back to defaults when it is missing.
    pub fn open(home: &Path) -> Result<Self> {
        let path = home.join(CONFIG_FILE);
        let config = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => JugglerConfig::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(config),
        })
    }

    /// In-memory repository that persists to `path` on update. Used by tests
    /// that want to start from a specific configuration.
    pub fn with_config(path: PathBuf, config: JugglerConfig) -> Self {
        Self {
            path,
            state: Mutex::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> JugglerConfig {
        self.lock().clone()
    }

    /// Apply `f` to the configuration and persist the result.
    ///
    /// The in-memory copy is only replaced once the file write succeeded.
    pub fn update<F>(&self, f: F) -> Result<JugglerConfig>
    where
        F: FnOnce(&mut JugglerConfig),
    {
        let mut guard = self.lock();
        let mut next = guard.clone();
        f(&mut next);
        save_atomic(&self.path, &next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn lock(&self) -> MutexGuard<'_, JugglerConfig> {
        // A panic while holding the lock cannot leave the config half-written,
        // updates only swap in a fully built value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn save_atomic(path: &Path, config: &JugglerConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let repo = ConfigRepository::open(dir.path()).unwrap();
        let config = repo.snapshot();
        assert_eq!(config, JugglerConfig::default());
        assert_eq!(config.shutdown_timeout_secs, 60);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let repo = ConfigRepository::open(dir.path()).unwrap();
        repo.update(|c| {
            c.idea_path = Some(PathBuf::from("/opt/idea/bin/idea.sh"));
            c.base_vm_options.content_hash = Some("abc".to_string());
        })
        .unwrap();

        let reloaded = ConfigRepository::open(dir.path()).unwrap().snapshot();
        assert_eq!(reloaded.idea_path, Some(PathBuf::from("/opt/idea/bin/idea.sh")));
        assert_eq!(reloaded.base_vm_options.content_hash.as_deref(), Some("abc"));
        assert!(!dir.path().join("config.json.tmp").exists());
    }

    #[test]
    fn uses_camel_case_keys() {
        let dir = tempdir().unwrap();
        let repo = ConfigRepository::open(dir.path()).unwrap();
        repo.update(|c| c.main_project = Some(PathBuf::from("/work/main")))
            .unwrap();
        let raw = std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert!(raw.contains("\"mainProject\""));
        assert!(raw.contains("\"baseVmOptions\""));
    }

    #[test]
    fn tolerates_partial_documents() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"ideaPath": "/usr/bin/idea", "somethingElse": true}"#,
        )
        .unwrap();
        let config = ConfigRepository::open(dir.path()).unwrap().snapshot();
        assert_eq!(config.idea_path, Some(PathBuf::from("/usr/bin/idea")));
        assert_eq!(config.shutdown_timeout_secs, 60);
        assert!(config.base_vm_options.path.is_none());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{not json").unwrap();
        assert!(ConfigRepository::open(dir.path()).is_err());
    }
}
