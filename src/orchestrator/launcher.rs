use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::error::{JugglerError, Result};

/// Boundary to the IDE process. Launches are fire-and-forget: the spawned
/// process is expected to outlive juggler.
pub trait Launcher: Send + Sync {
    fn launch(&self, executable: &Path, args: &[String], env: &BTreeMap<String, String>)
        -> Result<()>;
}

/// Spawns the real process, detached, with stdio discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(
        &self,
        executable: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut cmd = Command::new(executable);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        crate::platform::configure_detached(&mut cmd);

        let child = cmd.spawn().map_err(|source| JugglerError::Launch {
            executable: executable.to_path_buf(),
            source,
        })?;
        info!(pid = child.id(), executable = %executable.display(), "launched");
        Ok(())
    }
}
