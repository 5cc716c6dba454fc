use std::path::{Component, Path, PathBuf};
use std::process::Command;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use unix as imp;
#[cfg(windows)]
use windows as imp;

/// Detach a command from the calling process so it outlives it.
/// Unix: new process group, Windows: `DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP`
pub fn configure_detached(cmd: &mut Command) {
    imp::configure_detached(cmd)
}

/// Whether a process with the given PID is still alive.
pub fn is_process_alive(pid: u32) -> bool {
    imp::is_process_alive(pid)
}

pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Replace a leading `~` or `$HOME` component with the user's home directory.
/// Anything else, including `~user`, is returned as given.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    let starts_with_home = matches!(
        components.next(),
        Some(Component::Normal(first)) if first == "~" || first == "$HOME"
    );
    match (starts_with_home, home_dir()) {
        (true, Some(home)) => home.join(components.as_path()),
        _ => path.to_path_buf(),
    }
}

/// Turn a user-supplied path into an absolute one: home expansion first, then
/// relative paths are joined onto the current directory.
pub fn resolve_user_path(path: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        return expanded;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&expanded))
        .unwrap_or(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_and_dollar_home_expand() {
        let home = home_dir().unwrap();
        assert_eq!(expand_home(Path::new("~")), home);
        assert_eq!(expand_home(Path::new("~/code/app")), home.join("code/app"));
        assert_eq!(expand_home(Path::new("$HOME/code")), home.join("code"));
    }

    #[test]
    fn other_paths_are_untouched() {
        for raw in ["/opt/ide", "work/app", "/data/~backup", "~other/x", ""] {
            assert_eq!(expand_home(Path::new(raw)), PathBuf::from(raw));
        }
    }

    #[test]
    fn resolve_user_path_is_absolute() {
        assert!(resolve_user_path(Path::new("relative/dir")).is_absolute());
        assert!(resolve_user_path(Path::new("~/code")).is_absolute());
    }

    #[test]
    fn current_process_is_alive() {
        assert!(is_process_alive(std::process::id()));
    }
}
