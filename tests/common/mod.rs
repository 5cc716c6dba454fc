#![allow(dead_code)]
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use juggler::config::{BaseOptionsState, ConfigRepository, JugglerConfig};
use juggler::error::{JugglerError, Result};
use juggler::orchestrator::launcher::Launcher;
use juggler::orchestrator::Orchestrator;
use tempfile::TempDir;

/// Launcher that records invocations instead of starting anything.
#[derive(Default)]
pub struct RecordingLauncher {
    pub calls: Mutex<Vec<Launch>>,
    pub fail: bool,
}

#[derive(Debug, Clone)]
pub struct Launch {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl RecordingLauncher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(
        &self,
        executable: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<()> {
        if self.fail {
            return Err(JugglerError::Launch {
                executable: executable.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "ide not installed"),
            });
        }
        self.calls.lock().unwrap().push(Launch {
            executable: executable.to_path_buf(),
            args: args.to_vec(),
            env: env.clone(),
        });
        Ok(())
    }
}

/// A juggler home plus a fake base IDE installation and one project
/// directory, all inside a temp dir.
pub struct Workspace {
    pub dir: TempDir,
    pub home: PathBuf,
    pub base_options: PathBuf,
    pub base_config: PathBuf,
    pub base_plugins: PathBuf,
    pub project: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let home = root.join("juggler-home");
        let base_options = root.join("ide/bin/idea64.vmoptions");
        let base_config = root.join("ide/config");
        let base_plugins = root.join("ide/plugins");
        let project = root.join("work/shop");

        std::fs::create_dir_all(base_options.parent().unwrap()).unwrap();
        std::fs::write(&base_options, "-Xms256m\n-Xmx2048m\n").unwrap();
        std::fs::create_dir_all(base_config.join("options")).unwrap();
        std::fs::write(base_config.join("options/editor.xml"), "<editor/>").unwrap();
        std::fs::create_dir_all(base_plugins.join("vim/lib")).unwrap();
        std::fs::write(base_plugins.join("vim/lib/vim.jar"), "jar").unwrap();
        std::fs::create_dir_all(&project).unwrap();

        Self {
            dir,
            home,
            base_options,
            base_config,
            base_plugins,
            project,
        }
    }

    pub fn config(&self) -> JugglerConfig {
        JugglerConfig {
            idea_path: Some(PathBuf::from("/opt/ide/bin/idea.sh")),
            base_vm_options: BaseOptionsState {
                path: Some(self.base_options.clone()),
                content_hash: None,
            },
            base_config_path: Some(self.base_config.clone()),
            base_plugins_path: Some(self.base_plugins.clone()),
            ..JugglerConfig::default()
        }
    }

    /// Persist the fixture configuration to `<home>/config.json`.
    pub fn write_config(&self) {
        let repo = ConfigRepository::with_config(self.home.join("config.json"), self.config());
        repo.update(|_| {}).unwrap();
    }

    pub fn orchestrator(&self, launcher: Arc<RecordingLauncher>) -> Orchestrator {
        let repo = Arc::new(ConfigRepository::with_config(
            self.home.join("config.json"),
            self.config(),
        ));
        Orchestrator::new(self.home.clone(), repo, launcher)
    }

    pub fn extra_project(&self, name: &str) -> PathBuf {
        let path = self.project.parent().unwrap().join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }
}
