use anyhow::{bail, Result};
use std::path::Path;

use super::instance_state;
use crate::isolation::InstanceMarker;
use crate::orchestrator::registry::ProjectRegistry;
use crate::orchestrator::state::ProjectMetadata;
use crate::ui::summary::InstanceState;

pub fn run(home: &Path, queries: &[String], stale: bool) -> Result<()> {
    let registry = ProjectRegistry::new(home);

    let targets: Vec<ProjectMetadata> = if stale {
        let found = registry.stale()?;
        if found.is_empty() {
            println!("No stale projects.");
            return Ok(());
        }
        found
    } else {
        let mut found = Vec::new();
        let mut unknown = Vec::new();
        for query in queries {
            match registry.find(query)? {
                Some(meta) => found.push(meta),
                None => unknown.push(query.as_str()),
            }
        }
        if !unknown.is_empty() {
            bail!("no tracked project matches: {}", unknown.join(", "));
        }
        found
    };

    let mut skipped = 0;
    for meta in targets {
        let marker = InstanceMarker::for_layout(&registry.layout(&meta.id));
        if let InstanceState::Running(_) = instance_state(Some(&marker)) {
            println!("  Skipping {} ({}): instance is running", meta.name, meta.id);
            skipped += 1;
            continue;
        }
        if registry.remove(&meta.id)? {
            println!("  Removed {} ({})", meta.name, meta.id);
        }
    }

    if skipped > 0 {
        bail!("{} project(s) not removed; close their IDE first", skipped);
    }
    Ok(())
}
