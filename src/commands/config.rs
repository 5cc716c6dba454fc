use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::{ConfigCommands, ConfigKey};
use crate::config::{ConfigRepository, JugglerConfig};
use crate::identity::canonicalize_lenient;
use crate::platform::resolve_user_path;

fn existing_file(path: &Path) -> Result<PathBuf> {
    let path = resolve_user_path(path);
    if !path.is_file() {
        bail!("{} is not a file", path.display());
    }
    Ok(canonicalize_lenient(&path))
}

fn existing_dir(path: &Path) -> Result<PathBuf> {
    let path = resolve_user_path(path);
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Ok(canonicalize_lenient(&path))
}

fn show(config: &JugglerConfig, path: &Path) {
    fn opt(value: &Option<PathBuf>) -> String {
        value
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    }

    println!("  Config file:      {}", path.display());
    println!("  IDE executable:   {}", opt(&config.idea_path));
    println!("  Base vmoptions:   {}", opt(&config.base_vm_options.path));
    println!("  Base config:      {}", opt(&config.base_config_path));
    println!("  Base plugins:     {}", opt(&config.base_plugins_path));
    println!("  Main project:     {}", opt(&config.main_project));
    println!(
        "  Shutdown timeout: {}",
        humantime::format_duration(std::time::Duration::from_secs(
            config.shutdown_timeout_secs
        ))
    );
}

pub fn run(home: &Path, command: ConfigCommands) -> Result<()> {
    let repo = ConfigRepository::open(home)
        .with_context(|| format!("reading {}", home.join(crate::config::CONFIG_FILE).display()))?;

    let updated = match command {
        ConfigCommands::Show => {
            show(&repo.snapshot(), repo.path());
            return Ok(());
        }
        ConfigCommands::SetIdea { path } => {
            let path = existing_file(&path)?;
            repo.update(|c| c.idea_path = Some(path))?
        }
        ConfigCommands::SetBaseVmoptions { path } => {
            let path = existing_file(&path)?;
            // A new base file has no recorded hash, so the next launch regenerates.
            repo.update(|c| {
                c.base_vm_options.path = Some(path);
                c.base_vm_options.content_hash = None;
            })?
        }
        ConfigCommands::SetBaseConfig { path } => {
            let path = existing_dir(&path)?;
            repo.update(|c| c.base_config_path = Some(path))?
        }
        ConfigCommands::SetBasePlugins { path } => {
            let path = existing_dir(&path)?;
            repo.update(|c| c.base_plugins_path = Some(path))?
        }
        ConfigCommands::SetMainProject { path } => {
            let path = existing_dir(&path)?;
            repo.update(|c| c.main_project = Some(path))?
        }
        ConfigCommands::SetShutdownTimeout { timeout } => {
            if timeout.as_secs() == 0 {
                bail!("shutdown timeout must be at least one second");
            }
            repo.update(|c| c.shutdown_timeout_secs = timeout.as_secs())?
        }
        ConfigCommands::Unset { key } => repo.update(|c| match key {
            ConfigKey::Idea => c.idea_path = None,
            ConfigKey::BaseVmoptions => c.base_vm_options = Default::default(),
            ConfigKey::BaseConfig => c.base_config_path = None,
            ConfigKey::BasePlugins => c.base_plugins_path = None,
            ConfigKey::MainProject => c.main_project = None,
        })?,
    };

    show(&updated, repo.path());
    Ok(())
}
