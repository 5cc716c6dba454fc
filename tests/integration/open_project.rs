use std::sync::Arc;

use juggler::identity::ProjectIdentity;
use juggler::isolation::options::SENTINEL;
use juggler::orchestrator::VM_OPTIONS_ENV;

use crate::common::{RecordingLauncher, Workspace};

#[test]
fn first_open_builds_isolated_tree() {
    let ws = Workspace::new();
    let launcher = Arc::new(RecordingLauncher::default());
    let orchestrator = ws.orchestrator(launcher.clone());

    let report = orchestrator.launch(&ws.project).unwrap();
    let id = ProjectIdentity::identify(&ws.project).id;
    assert_eq!(report.identity.id, id);

    let root = ws.home.join("projects").join(&id);
    for dir in ["config", "system", "logs", "plugins"] {
        assert!(root.join(dir).is_dir(), "{dir} missing");
    }
    assert!(root.join("config/options/editor.xml").is_file());
    assert!(root.join("plugins/vim/lib/vim.jar").is_file());
    assert!(root.join("metadata.json").is_file());

    let options = std::fs::read_to_string(root.join("idea.vmoptions")).unwrap();
    assert!(options.starts_with("-Xms256m\n-Xmx2048m\n"));
    assert!(options.contains(SENTINEL));
    assert!(options.contains(&format!(
        "-Didea.config.path={}",
        root.join("config").display()
    )));
    assert!(options.contains(&format!("-Didea.juggler.home={}", ws.home.display())));

    let calls = launcher.calls.lock().unwrap();
    assert_eq!(
        calls[0].env.get(VM_OPTIONS_ENV).unwrap(),
        &root.join("idea.vmoptions").to_string_lossy().to_string()
    );
}

#[test]
fn reopen_keeps_user_edits_to_config() {
    let ws = Workspace::new();
    let orchestrator = ws.orchestrator(Arc::new(RecordingLauncher::default()));
    let report = orchestrator.launch(&ws.project).unwrap();
    let config = ws
        .home
        .join("projects")
        .join(&report.identity.id)
        .join("config");

    std::fs::write(config.join("options/editor.xml"), "<editor mine/>").unwrap();
    orchestrator.launch(&ws.project).unwrap();
    assert_eq!(
        std::fs::read_to_string(config.join("options/editor.xml")).unwrap(),
        "<editor mine/>"
    );
}

#[test]
fn each_project_gets_its_own_debug_port() {
    let ws = Workspace::new();
    std::fs::write(
        &ws.base_options,
        "-Xms256m\n-agentlib:jdwp=transport=dt_socket,server=y,suspend=n,address=*:5005\n",
    )
    .unwrap();
    let orchestrator = ws.orchestrator(Arc::new(RecordingLauncher::default()));

    let a = orchestrator.launch(&ws.project).unwrap();
    let b = orchestrator.launch(&ws.extra_project("billing")).unwrap();
    assert_ne!(a.debug_port, b.debug_port);

    let b_options = std::fs::read_to_string(b.options_file.unwrap()).unwrap();
    let port = b.debug_port.unwrap();
    assert!(b_options.contains(&format!("address=*:{port}")));
    assert!(!b_options.contains("address=*:5005"));
}
