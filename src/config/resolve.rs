use std::path::{Path, PathBuf};

/// Directory name used under the user's home when no override is given.
pub const DEFAULT_HOME_DIR: &str = ".idea-juggler";

/// Environment variable that overrides the juggler home directory.
pub const HOME_ENV: &str = "JUGGLER_HOME";

/// Resolve the juggler home directory. If `cli_home` is provided (flag or
/// `JUGGLER_HOME`, both handled by clap) it wins, with `~` expanded. Otherwise
/// `~/.idea-juggler` is used.
pub fn resolve_home(cli_home: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = cli_home {
        return Ok(crate::platform::resolve_user_path(path));
    }

    let home = crate::platform::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory; set {}", HOME_ENV))?;
    Ok(home.join(DEFAULT_HOME_DIR))
}
