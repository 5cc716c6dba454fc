use anyhow::{bail, Result};
use std::path::Path;

use super::instance_state;
use crate::identity::ProjectIdentity;
use crate::isolation::signals::SYNC_LOCK_FILE;
use crate::isolation::InstanceMarker;
use crate::orchestrator::Orchestrator;
use crate::platform::resolve_user_path;

pub fn run(home: &Path, query: &str) -> Result<()> {
    let orchestrator = Orchestrator::open(home.to_path_buf())?;

    let identity = ProjectIdentity::identify(&resolve_user_path(Path::new(query)));
    if orchestrator.is_main_project(&identity) {
        let state = instance_state(orchestrator.instance_marker(&identity).as_ref());
        println!("  Project: {} (main project)", identity.display_name());
        println!("    Path:    {}", identity.canonical_path.display());
        println!("    Status:  {}", state.label());
        return Ok(());
    }

    let Some(meta) = orchestrator.registry().find(query)? else {
        bail!("no tracked project matches '{}'", query);
    };
    let layout = orchestrator.registry().layout(&meta.id);
    let state = instance_state(Some(&InstanceMarker::for_layout(&layout)));

    println!("  Project: {} ({})", meta.name, meta.id);
    println!("    Path:    {}", meta.path.display());
    if !meta.path.exists() {
        println!("             (directory no longer exists)");
    }
    println!("    Config:  {}", layout.config.display());
    println!("    System:  {}", layout.system.display());
    println!("    Logs:    {}", layout.logs.display());
    println!("    Plugins: {}", layout.plugins.display());
    println!("    Options: {}", layout.options_file().display());
    match meta.debug_port {
        Some(port) => println!("    Debug:   localhost:{}", port),
        None => println!("    Debug:   -"),
    }
    println!(
        "    Opened:  {} times, last {}",
        meta.open_count,
        meta.last_opened_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("    Status:  {}", state.label());
    if layout.signals_dir().join(SYNC_LOCK_FILE).exists() {
        println!("    Sync:    in progress");
    }
    Ok(())
}
