pub mod clean;
pub mod config;
pub mod list;
pub mod open;
pub mod status;
pub mod sync;

use crate::isolation::InstanceMarker;
use crate::platform::is_process_alive;
use crate::ui::summary::InstanceState;

/// Classify an instance from its marker file and the PID written into it.
pub fn instance_state(marker: Option<&InstanceMarker>) -> InstanceState {
    let Some(marker) = marker.filter(|m| m.is_present()) else {
        return InstanceState::Stopped;
    };
    match marker.read_pid() {
        Some(pid) if is_process_alive(pid) => InstanceState::Running(Some(pid)),
        Some(pid) => InstanceState::Stale(pid),
        None => InstanceState::Running(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn state_from_marker() {
        let dir = tempdir().unwrap();
        let marker = InstanceMarker::in_config_dir(dir.path());
        assert_eq!(instance_state(None), InstanceState::Stopped);
        assert_eq!(instance_state(Some(&marker)), InstanceState::Stopped);

        std::fs::write(marker.path(), "").unwrap();
        assert_eq!(instance_state(Some(&marker)), InstanceState::Running(None));

        std::fs::write(marker.path(), std::process::id().to_string()).unwrap();
        assert_eq!(
            instance_state(Some(&marker)),
            InstanceState::Running(Some(std::process::id()))
        );
    }
}
