//! Generation of the per-project `idea.vmoptions` file.
//!
//! The file is the base options file with the debug-agent port rewritten,
//! followed by a managed block of `-D` overrides that point the IDE at the
//! project's isolated directories:
//!
//! ```text
//! -Xms512m
//! -agentlib:jdwp=transport=dt_socket,server=y,suspend=n,address=*:5003
//!
//! # IDEA Juggler overrides (auto-generated)
//! -Didea.config.path=/home/me/.idea-juggler/projects/<id>/config
//! ...
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::ProjectLayout;
use crate::error::{JugglerError, Result};

pub const SENTINEL: &str = "# IDEA Juggler overrides (auto-generated)";

const CONFIG_PATH_KEY: &str = "-Didea.config.path=";
const SYSTEM_PATH_KEY: &str = "-Didea.system.path=";
const LOG_PATH_KEY: &str = "-Didea.log.path=";
const PLUGINS_PATH_KEY: &str = "-Didea.plugins.path=";
const HOME_KEY: &str = "-Didea.juggler.home=";

const MANAGED_KEYS: [&str; 5] = [
    CONFIG_PATH_KEY,
    SYSTEM_PATH_KEY,
    LOG_PATH_KEY,
    PLUGINS_PATH_KEY,
    HOME_KEY,
];

const AGENT_PREFIXES: [&str; 2] = ["-agentlib:jdwp=", "-Xrunjdwp:"];

/// `address=PORT`, `address=*:PORT` and `address=host:PORT`.
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(address=)((?:[^,:\s]+:)?)(\d+)").expect("address regex must compile")
});

/// Writes options files for projects living under one juggler home.
#[derive(Debug, Clone)]
pub struct OptionsGenerator {
    juggler_home: PathBuf,
}

impl OptionsGenerator {
    pub fn new(juggler_home: impl Into<PathBuf>) -> Self {
        Self {
            juggler_home: juggler_home.into(),
        }
    }

    /// Produce or patch `layout.options_file()` and return its path.
    ///
    /// An existing file is only patched (managed block replaced or appended)
    /// unless `force_regenerate` is set, in which case it is rebuilt from the
    /// base file. A forced rebuild from a configured base file that is gone
    /// fails with [`JugglerError::NotFound`] and leaves the target untouched.
    pub fn generate(
        &self,
        base_options: Option<&Path>,
        layout: &ProjectLayout,
        debug_port: Option<u16>,
        force_regenerate: bool,
    ) -> Result<PathBuf> {
        let target = layout.options_file();
        let block = self.managed_block(layout);

        let content = if target.is_file() && !force_regenerate {
            let existing = std::fs::read_to_string(&target)?;
            debug!(path = %target.display(), "patching managed block of options file");
            patch_managed_block(&existing, &block)
        } else {
            let base = match base_options {
                Some(path) if path.is_file() => std::fs::read_to_string(path)?,
                Some(path) if force_regenerate => {
                    return Err(JugglerError::NotFound(format!(
                        "base options file {}",
                        path.display()
                    )));
                }
                _ => String::new(),
            };
            debug!(path = %target.display(), ?debug_port, "rebuilding options file");
            render(&base, &block, debug_port)
        };

        write_atomic(&target, &content)?;
        Ok(target)
    }

    fn managed_block(&self, layout: &ProjectLayout) -> Vec<String> {
        vec![
            SENTINEL.to_string(),
            format!("{CONFIG_PATH_KEY}{}", layout.config.display()),
            format!("{SYSTEM_PATH_KEY}{}", layout.system.display()),
            format!("{LOG_PATH_KEY}{}", layout.logs.display()),
            format!("{PLUGINS_PATH_KEY}{}", layout.plugins.display()),
            format!("{HOME_KEY}{}", self.juggler_home.display()),
        ]
    }
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

fn is_managed_key_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    MANAGED_KEYS.iter().any(|key| trimmed.starts_with(key))
}

fn is_sentinel(line: &str) -> bool {
    line.trim() == SENTINEL
}

fn is_agent_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    AGENT_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix))
}

/// Rewrite the port of every `address=` in a debug-agent line.
pub fn substitute_port(line: &str, port: u16) -> String {
    ADDRESS_RE
        .replace_all(line, format!("${{1}}${{2}}{port}").as_str())
        .into_owned()
}

fn push_block(out: &mut String, block: &[String]) {
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        if !out.ends_with("\n\n") {
            out.push('\n');
        }
    }
    for line in block {
        out.push_str(line);
        out.push('\n');
    }
}

/// Build an options file from scratch: base lines minus stale managed lines,
/// agent port rewritten, managed block appended.
fn render(base: &str, block: &[String], debug_port: Option<u16>) -> String {
    let mut out = String::with_capacity(base.len() + 512);
    for line in base.split_inclusive('\n') {
        let body = strip_eol(line);
        if is_sentinel(body) || is_managed_key_line(body) {
            continue;
        }
        match debug_port {
            Some(port) if is_agent_line(body) => out.push_str(&substitute_port(line, port)),
            _ => out.push_str(line),
        }
    }
    push_block(&mut out, block);
    out
}

/// Replace the managed block in `existing` in place, or append it.
fn patch_managed_block(existing: &str, block: &[String]) -> String {
    let lines: Vec<&str> = existing.split_inclusive('\n').collect();
    let Some(start) = lines.iter().position(|l| is_sentinel(strip_eol(l))) else {
        let mut out = existing.to_string();
        push_block(&mut out, block);
        return out;
    };

    let mut end = start + 1;
    while end < lines.len() && is_managed_key_line(strip_eol(lines[end])) {
        end += 1;
    }

    let mut out = lines[..start].concat();
    for line in block {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&lines[end..].concat());
    out
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("vmoptions.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
