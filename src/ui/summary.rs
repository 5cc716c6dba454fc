use chrono::{DateTime, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::orchestrator::state::ProjectMetadata;
use crate::orchestrator::LaunchReport;

/// Whether a project's IDE instance looks alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Running(Option<u32>),
    /// Marker present but the PID inside is gone.
    Stale(u32),
    Stopped,
}

impl InstanceState {
    pub fn label(&self) -> String {
        match self {
            InstanceState::Running(Some(pid)) => format!("running (pid {pid})"),
            InstanceState::Running(None) => "running".to_string(),
            InstanceState::Stale(pid) => format!("stale lock (pid {pid})"),
            InstanceState::Stopped => "stopped".to_string(),
        }
    }

    fn colored(&self) -> String {
        let label = self.label();
        match self {
            InstanceState::Running(_) => format!("{} {}", "\u{25cf}".green(), label.green()),
            InstanceState::Stale(_) => format!("{} {}", "\u{25cf}".yellow(), label.yellow()),
            InstanceState::Stopped => format!("\u{25cf} {}", label.dimmed()),
        }
    }
}

pub struct ProjectRow {
    pub meta: ProjectMetadata,
    pub state: InstanceState,
}

/// "3m ago" style age, rounded down to whole seconds.
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0) as u64;
    let age = humantime::format_duration(std::time::Duration::from_secs(secs)).to_string();
    // Keep only the most significant unit.
    let first = age.split_whitespace().next().unwrap_or("0s");
    format!("{first} ago")
}

pub fn print_project_table(rows: &[ProjectRow]) {
    let use_color = std::io::stdout().is_terminal();
    let now = Utc::now();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Project").set_alignment(CellAlignment::Left),
        Cell::new("Id").set_alignment(CellAlignment::Left),
        Cell::new("Path").set_alignment(CellAlignment::Left),
        Cell::new("Debug").set_alignment(CellAlignment::Right),
        Cell::new("Opens").set_alignment(CellAlignment::Right),
        Cell::new("Last opened").set_alignment(CellAlignment::Left),
        Cell::new("Status").set_alignment(CellAlignment::Center),
    ]);

    for row in rows {
        let port = row
            .meta
            .debug_port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = if use_color {
            row.state.colored()
        } else {
            row.state.label()
        };
        let path = row.meta.path.display().to_string();
        let path = if row.meta.path.exists() || !use_color {
            path
        } else {
            path.red().to_string()
        };

        table.add_row(vec![
            Cell::new(&row.meta.name),
            Cell::new(&row.meta.id),
            Cell::new(&path),
            Cell::new(&port).set_alignment(CellAlignment::Right),
            Cell::new(row.meta.open_count).set_alignment(CellAlignment::Right),
            Cell::new(format_age(row.meta.last_opened_at, now)),
            Cell::new(&status),
        ]);
    }

    for line in table.to_string().lines() {
        println!("  {}", line);
    }
}

pub fn print_launch_summary(report: &LaunchReport) {
    let use_color = std::io::stdout().is_terminal();
    let name = report.identity.display_name();

    println!();
    if !report.isolated() {
        if use_color {
            println!("  {} {} (main project, shared config)", "Opened".bold(), name.cyan());
        } else {
            println!("  Opened {} (main project, shared config)", name);
        }
        println!();
        return;
    }

    if use_color {
        println!(
            "  {} {} ({})",
            "Opened".bold(),
            name.cyan(),
            report.identity.id.dimmed()
        );
    } else {
        println!("  Opened {} ({})", name, report.identity.id);
    }
    if let Some(options) = &report.options_file {
        println!("    Options: {}", options.display());
    }
    if let Some(port) = report.debug_port {
        println!("    Debug:   localhost:{}", port);
    }
    println!();
}
