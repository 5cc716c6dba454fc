use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::Workspace;

fn juggler(ws: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("juggler").unwrap();
    cmd.env("JUGGLER_HOME", &ws.home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn list_on_empty_home() {
    let ws = Workspace::new();
    juggler(&ws)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects tracked yet"));
}

#[test]
fn config_show_reads_home_config() {
    let ws = Workspace::new();
    ws.write_config();
    juggler(&ws)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(ws.base_config.to_string_lossy().to_string()))
        .stdout(predicate::str::contains("1m"));
}

#[test]
fn config_set_persists() {
    let ws = Workspace::new();
    juggler(&ws)
        .args(["config", "set-base-plugins"])
        .arg(&ws.base_plugins)
        .assert()
        .success();
    let saved = std::fs::read_to_string(ws.home.join("config.json")).unwrap();
    assert!(saved.contains("basePluginsPath"));
}

#[test]
fn open_without_ide_fails_with_hint() {
    let ws = Workspace::new();
    juggler(&ws)
        .arg("open")
        .arg(&ws.project)
        .assert()
        .failure()
        .stderr(predicate::str::contains("juggler config set-idea"));
}

#[test]
fn status_of_unknown_project_fails() {
    let ws = Workspace::new();
    juggler(&ws)
        .args(["status", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no tracked project matches"));
}

#[test]
fn clean_unknown_project_fails() {
    let ws = Workspace::new();
    juggler(&ws)
        .args(["clean", "cafe01"])
        .assert()
        .failure();
}

#[test]
fn home_flag_overrides_env() {
    let ws = Workspace::new();
    let other = ws.dir.path().join("other-home");
    juggler(&ws)
        .args(["config", "set-base-config"])
        .arg(&ws.base_config)
        .arg("--home")
        .arg(&other)
        .assert()
        .success();
    assert!(other.join("config.json").is_file());
    assert!(!ws.home.join("config.json").exists());
}
