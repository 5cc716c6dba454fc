use anyhow::Result;
use std::path::Path;

use super::instance_state;
use crate::isolation::InstanceMarker;
use crate::orchestrator::registry::ProjectRegistry;
use crate::ui::summary::{print_project_table, ProjectRow};

pub fn run(home: &Path) -> Result<()> {
    let registry = ProjectRegistry::new(home);
    let projects = registry.list()?;
    if projects.is_empty() {
        println!("No projects tracked yet.");
        println!("Run `juggler open <path>` to open one.");
        return Ok(());
    }

    let rows: Vec<ProjectRow> = projects
        .into_iter()
        .map(|meta| {
            let marker = InstanceMarker::for_layout(&registry.layout(&meta.id));
            ProjectRow {
                state: instance_state(Some(&marker)),
                meta,
            }
        })
        .collect();

    println!();
    print_project_table(&rows);
    println!();
    Ok(())
}
