use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::orchestrator::Orchestrator;
use crate::platform::resolve_user_path;
use crate::ui::summary::print_launch_summary;

pub fn run(home: &Path, path: &Path) -> Result<()> {
    let path = resolve_user_path(path);
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }

    let orchestrator =
        Orchestrator::open(home.to_path_buf()).context("loading juggler configuration")?;
    let report = orchestrator
        .launch(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    print_launch_summary(&report);
    Ok(())
}
