use std::sync::Arc;

use crate::common::{RecordingLauncher, Workspace};

#[test]
fn clean_removes_tree_and_listing_entry() {
    let ws = Workspace::new();
    let orchestrator = ws.orchestrator(Arc::new(RecordingLauncher::default()));
    let kept = orchestrator.launch(&ws.extra_project("kept")).unwrap();
    let report = orchestrator.launch(&ws.project).unwrap();
    let root = ws.home.join("projects").join(&report.identity.id);
    assert!(root.is_dir());

    assert!(orchestrator.clean(&report.identity.id).unwrap());
    assert!(!root.exists());

    let ids: Vec<String> = orchestrator
        .registry()
        .list()
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![kept.identity.id]);
}

#[test]
fn reopening_after_clean_starts_fresh() {
    let ws = Workspace::new();
    let orchestrator = ws.orchestrator(Arc::new(RecordingLauncher::default()));
    let first = orchestrator.launch(&ws.project).unwrap();
    orchestrator.launch(&ws.project).unwrap();
    orchestrator.clean(&first.identity.id).unwrap();

    orchestrator.launch(&ws.project).unwrap();
    let meta = orchestrator.registry().load(&first.identity.id).unwrap();
    assert_eq!(meta.open_count, 1);
}

#[test]
fn stale_projects_are_detected() {
    let ws = Workspace::new();
    let orchestrator = ws.orchestrator(Arc::new(RecordingLauncher::default()));
    let doomed = ws.extra_project("doomed");
    orchestrator.launch(&doomed).unwrap();
    orchestrator.launch(&ws.project).unwrap();
    std::fs::remove_dir_all(&doomed).unwrap();

    let stale = orchestrator.registry().stale().unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].name, "doomed");
}
