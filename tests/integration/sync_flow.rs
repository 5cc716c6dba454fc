use std::sync::Arc;
use std::time::Duration;

use juggler::error::JugglerError;
use juggler::isolation::signals::{LockAcquisition, SignalDir};
use juggler::orchestrator::shutdown::WaitPolicy;
use juggler::orchestrator::{
    RestartOutcome, SyncFlags, SyncKind, SyncOptions, SyncProgress,
};

use crate::common::{RecordingLauncher, Workspace};

fn quick(timeout: Duration) -> SyncOptions {
    SyncOptions {
        wait: WaitPolicy {
            poll_interval: Duration::from_millis(10),
            timeout,
        },
        ..SyncOptions::default()
    }
}

#[tokio::test]
async fn base_options_change_reaches_project_after_sync() {
    let ws = Workspace::new();
    let orchestrator = ws.orchestrator(Arc::new(RecordingLauncher::default()));
    let report = orchestrator.launch(&ws.project).unwrap();
    let options_file = report.options_file.unwrap();
    assert!(std::fs::read_to_string(&options_file)
        .unwrap()
        .contains("-Xms256m"));

    std::fs::write(&ws.base_options, "-Xms512m\n-Xmx2048m\n").unwrap();
    let sync = orchestrator
        .sync(
            &ws.project,
            SyncFlags {
                vm_options: true,
                ..SyncFlags::default()
            },
            SyncOptions::default(),
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(sync.synced, vec![SyncKind::VmOptions]);
    let content = std::fs::read_to_string(&options_file).unwrap();
    assert!(content.contains("-Xms512m"));
    assert!(!content.contains("-Xms256m"));
}

#[tokio::test]
async fn running_instance_is_stopped_synced_and_restarted() {
    let ws = Workspace::new();
    let launcher = Arc::new(RecordingLauncher::default());
    let orchestrator = ws.orchestrator(launcher.clone());
    let report = orchestrator.launch(&ws.project).unwrap();
    let layout = orchestrator.registry().layout(&report.identity.id);
    let marker = layout.config.join(".lock");
    std::fs::write(&marker, "12345").unwrap();
    std::fs::write(ws.base_config.join("options/editor.xml"), "<editor v2/>").unwrap();

    let stop_request = layout.signals_dir().join("stop-request.json");
    let ide = tokio::spawn(async move {
        for _ in 0..400 {
            if stop_request.exists() {
                let raw = std::fs::read_to_string(&stop_request).unwrap();
                std::fs::remove_file(&marker).unwrap();
                return Some(raw);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    });

    let mut events = Vec::new();
    let sync = orchestrator
        .sync(
            &ws.project,
            SyncFlags::all(),
            quick(Duration::from_secs(5)),
            |p| events.push(p),
        )
        .await
        .unwrap();

    let raw = ide.await.unwrap().expect("instance never saw a stop request");
    let request: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(request["autoRestart"], true);
    assert_eq!(
        request["syncTypes"],
        serde_json::json!(["vmoptions", "config", "plugins"])
    );

    assert!(sync.stopped);
    assert_eq!(sync.restart, RestartOutcome::Restarted);
    assert_eq!(launcher.count(), 2);
    assert_eq!(
        std::fs::read_to_string(layout.config.join("options/editor.xml")).unwrap(),
        "<editor v2/>"
    );
    assert!(events.contains(&SyncProgress::InstanceStopped));
    assert!(!layout.signals_dir().join("sync-in-progress.lock").exists());
}

#[tokio::test]
async fn concurrent_sync_is_rejected() {
    let ws = Workspace::new();
    let orchestrator = ws.orchestrator(Arc::new(RecordingLauncher::default()));
    let report = orchestrator.launch(&ws.project).unwrap();
    let signals = SignalDir::for_layout(&orchestrator.registry().layout(&report.identity.id));

    let held = signals.acquire_sync_lock().unwrap();
    assert!(matches!(held, LockAcquisition::Acquired(_)));
    let err = orchestrator
        .sync(&ws.project, SyncFlags::all(), SyncOptions::default(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, JugglerError::AlreadyInProgress { .. }));

    drop(held);
    orchestrator
        .sync(&ws.project, SyncFlags::all(), SyncOptions::default(), |_| {})
        .await
        .unwrap();
}

#[tokio::test]
async fn shutdown_timeout_syncs_nothing() {
    let ws = Workspace::new();
    let orchestrator = ws.orchestrator(Arc::new(RecordingLauncher::default()));
    let report = orchestrator.launch(&ws.project).unwrap();
    let layout = orchestrator.registry().layout(&report.identity.id);
    std::fs::write(layout.config.join(".lock"), "12345").unwrap();

    std::fs::write(ws.base_config.join("options/editor.xml"), "<editor v2/>").unwrap();
    let err = orchestrator
        .sync(
            &ws.project,
            SyncFlags::all(),
            quick(Duration::from_millis(80)),
            |_| {},
        )
        .await
        .unwrap_err();

    assert!(matches!(err, JugglerError::ShutdownTimeout { .. }));
    assert_eq!(
        std::fs::read_to_string(layout.config.join("options/editor.xml")).unwrap(),
        "<editor/>"
    );
    assert_eq!(std::fs::read_dir(layout.signals_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_base_config_leaves_running_instance_alone() {
    let ws = Workspace::new();
    let launcher = Arc::new(RecordingLauncher::default());
    let orchestrator = ws.orchestrator(launcher.clone());
    let report = orchestrator.launch(&ws.project).unwrap();
    let layout = orchestrator.registry().layout(&report.identity.id);
    let marker = layout.config.join(".lock");
    std::fs::write(&marker, "12345").unwrap();
    let options_before = std::fs::read_to_string(layout.options_file()).unwrap();
    std::fs::write(&ws.base_options, "-Xms512m\n").unwrap();
    std::fs::remove_dir_all(&ws.base_config).unwrap();

    let mut events = Vec::new();
    let err = orchestrator
        .sync(
            &ws.project,
            SyncFlags {
                vm_options: true,
                config: true,
                ..SyncFlags::default()
            },
            quick(Duration::from_secs(5)),
            |p| events.push(p),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, JugglerError::ConfigurationMissing { .. }));
    assert!(events.is_empty(), "nothing stopped or synced: {events:?}");
    assert!(marker.exists());
    assert!(!layout.signals_dir().join("stop-request.json").exists());
    assert_eq!(
        std::fs::read_to_string(layout.options_file()).unwrap(),
        options_before
    );
    assert_eq!(launcher.count(), 1);
}

#[tokio::test]
async fn live_sync_without_stopping_warns() {
    let ws = Workspace::new();
    let launcher = Arc::new(RecordingLauncher::default());
    let orchestrator = ws.orchestrator(launcher.clone());
    let report = orchestrator.launch(&ws.project).unwrap();
    let layout = orchestrator.registry().layout(&report.identity.id);
    std::fs::write(layout.config.join(".lock"), "12345").unwrap();

    let mut events = Vec::new();
    let sync = orchestrator
        .sync(
            &ws.project,
            SyncFlags {
                config: true,
                plugins: true,
                ..SyncFlags::default()
            },
            SyncOptions {
                stop_if_running: false,
                ..SyncOptions::default()
            },
            |p| events.push(p),
        )
        .await
        .unwrap();

    assert!(sync.was_running && !sync.stopped);
    assert_eq!(sync.restart, RestartOutcome::NotRequested);
    assert!(matches!(events[0], SyncProgress::Warning(_)));
    assert!(!layout.signals_dir().join("stop-request.json").exists());
    assert!(layout.config.join(".lock").exists(), "live marker survives");
    assert_eq!(launcher.count(), 1);
}
