pub mod launcher;
pub mod ports;
pub mod registry;
pub mod shutdown;
pub mod state;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ConfigRepository, JugglerConfig};
use crate::error::{JugglerError, Result};
use crate::identity::ProjectIdentity;
use crate::isolation::base_tracker::BaseChangeTracker;
use crate::isolation::layout::BaseDirs;
use crate::isolation::mirror::{force_copy, MirrorFilter};
use crate::isolation::options::OptionsGenerator;
use crate::isolation::signals::{LockAcquisition, SignalDir, StopRequest, SyncLock};
use crate::isolation::{InstanceMarker, ProjectLayout};

use launcher::{Launcher, SystemLauncher};
use ports::{allocate_debug_port, MAX_DEBUG_PORT, MIN_DEBUG_PORT};
use registry::ProjectRegistry;
use shutdown::{ShutdownWaiter, WaitOutcome, WaitPolicy};
use state::ProjectMetadata;

/// Environment variable the IDE reads its options file path from.
pub const VM_OPTIONS_ENV: &str = "IDEA_VM_OPTIONS";

/// Stop requests older than this are leftovers from a crashed sync.
const STALE_STOP_REQUEST_MINUTES: u64 = 10;

// ---------------------------------------------------------------------------
// Sync parameters and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    VmOptions,
    Config,
    Plugins,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::VmOptions => "vmoptions",
            SyncKind::Config => "config",
            SyncKind::Plugins => "plugins",
        }
    }
}

impl std::fmt::Display for SyncKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which parts of the base installation to re-mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncFlags {
    pub vm_options: bool,
    pub config: bool,
    pub plugins: bool,
}

impl SyncFlags {
    pub fn all() -> Self {
        Self {
            vm_options: true,
            config: true,
            plugins: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.vm_options || self.config || self.plugins)
    }

    pub fn kinds(&self) -> Vec<SyncKind> {
        let mut kinds = Vec::new();
        if self.vm_options {
            kinds.push(SyncKind::VmOptions);
        }
        if self.config {
            kinds.push(SyncKind::Config);
        }
        if self.plugins {
            kinds.push(SyncKind::Plugins);
        }
        kinds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub stop_if_running: bool,
    pub auto_restart: bool,
    pub wait: WaitPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            stop_if_running: true,
            auto_restart: true,
            wait: WaitPolicy::default(),
        }
    }
}

/// Events reported while a sync runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncProgress {
    StopRequested { timeout_secs: u64 },
    WaitingForShutdown { elapsed_secs: u64, timeout_secs: u64 },
    InstanceStopped,
    Synced(SyncKind),
    Restarted,
    RestartFailed(String),
    Warning(String),
}

// ---------------------------------------------------------------------------
// SyncPhase: state tracking for one sync attempt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    LockAcquired,
    Stopping,
    Syncing,
    Restarting,
    Done,
    Rejected,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    NotRequested,
    Restarted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub project_id: String,
    pub phase: SyncPhase,
    pub was_running: bool,
    pub stopped: bool,
    pub synced: Vec<SyncKind>,
    pub restart: RestartOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    pub identity: ProjectIdentity,
    /// `None` for the main project, which is not isolated.
    pub options_file: Option<PathBuf>,
    pub debug_port: Option<u16>,
}

impl LaunchReport {
    pub fn isolated(&self) -> bool {
        self.options_file.is_some()
    }
}

/// Holds the sync lock for one sync attempt. Dropping it removes the signal
/// files and then releases the lock, whichever way the sync ended.
struct SyncSession {
    signals: SignalDir,
    lock: Option<SyncLock>,
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        let removed = self.signals.cleanup();
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
        debug!(removed, "sync session closed");
    }
}

fn advance(phase: &mut SyncPhase, next: SyncPhase) {
    debug!(from = ?phase, to = ?next, "sync phase");
    *phase = next;
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Composes identity, layout, options generation and the signal protocol into
/// the two user-facing operations: launching a project and syncing it with
/// the base installation.
pub struct Orchestrator {
    home: PathBuf,
    config: Arc<ConfigRepository>,
    registry: ProjectRegistry,
    tracker: BaseChangeTracker,
    options: OptionsGenerator,
    launcher: Arc<dyn Launcher>,
}

impl Orchestrator {
    /// Orchestrator over `home` using its `config.json` and real process
    /// launches.
    pub fn open(home: PathBuf) -> Result<Self> {
        let config = Arc::new(ConfigRepository::open(&home)?);
        Ok(Self::new(home, config, Arc::new(SystemLauncher)))
    }

    pub fn new(home: PathBuf, config: Arc<ConfigRepository>, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            registry: ProjectRegistry::new(&home),
            tracker: BaseChangeTracker::new(Arc::clone(&config)),
            options: OptionsGenerator::new(&home),
            home,
            config,
            launcher,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &Arc<ConfigRepository> {
        &self.config
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn is_main_project(&self, identity: &ProjectIdentity) -> bool {
        self.config
            .snapshot()
            .main_project
            .map(|main| ProjectIdentity::identify(&main).id == identity.id)
            .unwrap_or(false)
    }

    /// Marker whose presence means the project's IDE instance is running.
    /// The main project's marker lives in the base config directory, so it has
    /// none when that directory is not configured.
    pub fn instance_marker(&self, identity: &ProjectIdentity) -> Option<InstanceMarker> {
        if self.is_main_project(identity) {
            return self
                .config
                .snapshot()
                .base_config_path
                .map(|dir| InstanceMarker::in_config_dir(&dir));
        }
        Some(InstanceMarker::for_layout(&self.registry.layout(&identity.id)))
    }

    pub fn is_running(&self, identity: &ProjectIdentity) -> bool {
        self.instance_marker(identity)
            .map(|m| m.is_present())
            .unwrap_or(false)
    }

    fn base_dirs(config: &JugglerConfig) -> BaseDirs {
        BaseDirs {
            config: config.base_config_path.clone(),
            plugins: config.base_plugins_path.clone(),
        }
    }

    fn idea_executable(config: &JugglerConfig) -> Result<PathBuf> {
        config
            .idea_path
            .clone()
            .ok_or(JugglerError::ConfigurationMissing {
                what: "IDE executable",
                hint: "set-idea <path>",
            })
    }

    /// Open the project at `project_path` in its own isolated IDE instance,
    /// or directly against the base configuration for the main project.
    pub fn launch(&self, project_path: &Path) -> Result<LaunchReport> {
        let identity = ProjectIdentity::identify(project_path);
        let config = self.config.snapshot();
        let executable = Self::idea_executable(&config)?;
        let project_arg = identity.canonical_path.to_string_lossy().to_string();

        if self.is_main_project(&identity) {
            info!(path = %identity.canonical_path.display(), "opening main project without isolation");
            self.launcher
                .launch(&executable, &[project_arg], &BTreeMap::new())?;
            return Ok(LaunchReport {
                identity,
                options_file: None,
                debug_port: None,
            });
        }

        let base_changed = self.tracker.has_changed()?;
        if base_changed {
            info!("base options file changed since last sync, regenerating");
        }

        let meta = self.registry.record_open(&identity)?;
        let layout = self.registry.layout(&identity.id);
        layout.ensure(&Self::base_dirs(&config))?;

        let debug_port = match meta.debug_port {
            Some(port) => Some(port),
            None => self.assign_debug_port(&layout, &identity.id)?,
        };

        let options_file = self.options.generate(
            config.base_vm_options.path.as_deref(),
            &layout,
            debug_port,
            base_changed,
        )?;
        if base_changed {
            self.tracker.update_hash()?;
        }

        SignalDir::for_layout(&layout).cleanup_stale(STALE_STOP_REQUEST_MINUTES);

        let mut env = BTreeMap::new();
        env.insert(
            VM_OPTIONS_ENV.to_string(),
            options_file.to_string_lossy().to_string(),
        );
        self.launcher.launch(&executable, &[project_arg], &env)?;
        info!(
            id = %identity.id,
            open_count = meta.open_count,
            ?debug_port,
            "opened isolated project"
        );

        Ok(LaunchReport {
            identity,
            options_file: Some(options_file),
            debug_port,
        })
    }

    fn assign_debug_port(&self, layout: &ProjectLayout, id: &str) -> Result<Option<u16>> {
        let used = self.registry.used_ports(id)?;
        let port = allocate_debug_port(&used).ok_or(JugglerError::PortsExhausted {
            min: MIN_DEBUG_PORT,
            max: MAX_DEBUG_PORT,
        })?;
        debug!(id, port, "allocated debug port");
        ProjectMetadata::assign_debug_port(&layout.root, port)
    }

    /// Fail before touching anything if a requested part has no base source,
    /// or its configured source is gone from disk.
    fn check_sync_sources(config: &JugglerConfig, flags: SyncFlags) -> Result<()> {
        let options_ok = config
            .base_vm_options
            .path
            .as_deref()
            .is_some_and(Path::is_file);
        if flags.vm_options && !options_ok {
            return Err(JugglerError::ConfigurationMissing {
                what: "base options file",
                hint: "set-base-vmoptions <file>",
            });
        }
        if flags.config && !config.base_config_path.as_deref().is_some_and(Path::is_dir) {
            return Err(JugglerError::ConfigurationMissing {
                what: "base config directory",
                hint: "set-base-config <dir>",
            });
        }
        if flags.plugins && !config.base_plugins_path.as_deref().is_some_and(Path::is_dir) {
            return Err(JugglerError::ConfigurationMissing {
                what: "base plugins directory",
                hint: "set-base-plugins <dir>",
            });
        }
        Ok(())
    }

    /// Copy the requested parts, reporting each as it lands.
    fn apply_sync<F>(
        &self,
        config: &JugglerConfig,
        layout: &ProjectLayout,
        flags: SyncFlags,
        debug_port: Option<u16>,
        synced: &mut Vec<SyncKind>,
        on_progress: &mut F,
    ) -> Result<()>
    where
        F: FnMut(SyncProgress),
    {
        if flags.vm_options {
            self.options.generate(
                config.base_vm_options.path.as_deref(),
                layout,
                debug_port,
                true,
            )?;
            self.tracker.update_hash()?;
            synced.push(SyncKind::VmOptions);
            on_progress(SyncProgress::Synced(SyncKind::VmOptions));
        }
        if let (true, Some(base)) = (flags.config, config.base_config_path.as_deref()) {
            let files = force_copy(base, &layout.config, &MirrorFilter::config_defaults())?;
            debug!(files, "config synced");
            synced.push(SyncKind::Config);
            on_progress(SyncProgress::Synced(SyncKind::Config));
        }
        if let (true, Some(base)) = (flags.plugins, config.base_plugins_path.as_deref()) {
            let files = force_copy(base, &layout.plugins, &MirrorFilter::plugins_defaults())?;
            debug!(files, "plugins synced");
            synced.push(SyncKind::Plugins);
            on_progress(SyncProgress::Synced(SyncKind::Plugins));
        }
        Ok(())
    }

    /// Relaunch a project this sync stopped.
    fn restart<F>(
        &self,
        signals: &SignalDir,
        identity: &ProjectIdentity,
        on_progress: &mut F,
    ) -> RestartOutcome
    where
        F: FnMut(SyncProgress),
    {
        // The relaunched instance must not find our stop request.
        signals.cleanup();
        match self.launch(&identity.canonical_path) {
            Ok(_) => {
                on_progress(SyncProgress::Restarted);
                RestartOutcome::Restarted
            }
            Err(e) => {
                warn!(id = %identity.id, error = %e, "restart after sync failed");
                on_progress(SyncProgress::RestartFailed(e.to_string()));
                RestartOutcome::Failed(e.to_string())
            }
        }
    }

    /// Re-mirror the requested parts of the base installation into the
    /// project's isolated directories, stopping and restarting a running
    /// instance around the copy when asked to.
    ///
    /// Only one sync per project runs at a time; a concurrent attempt fails
    /// with [`JugglerError::AlreadyInProgress`]. If the instance does not
    /// stop in time nothing is synced.
    pub async fn sync<F>(
        &self,
        project_path: &Path,
        flags: SyncFlags,
        options: SyncOptions,
        mut on_progress: F,
    ) -> Result<SyncReport>
    where
        F: FnMut(SyncProgress),
    {
        let identity = ProjectIdentity::identify(project_path);
        if self.is_main_project(&identity) {
            return Err(JugglerError::NotIsolated(
                identity.canonical_path.display().to_string(),
            ));
        }
        let meta = self.registry.load(&identity.id).ok_or_else(|| {
            JugglerError::NotFound(format!("project {}", identity.canonical_path.display()))
        })?;
        let layout = self.registry.layout(&identity.id);
        let signals = SignalDir::for_layout(&layout);

        let mut phase = SyncPhase::Idle;
        let lock = match signals.acquire_sync_lock()? {
            LockAcquisition::Acquired(lock) => lock,
            LockAcquisition::AlreadyHeld => {
                advance(&mut phase, SyncPhase::Rejected);
                return Err(JugglerError::AlreadyInProgress {
                    project: meta.name.clone(),
                });
            }
        };
        let session = SyncSession {
            signals: signals.clone(),
            lock: Some(lock),
        };
        advance(&mut phase, SyncPhase::LockAcquired);

        let config = self.config.snapshot();
        Self::check_sync_sources(&config, flags)?;
        let debug_port = match meta.debug_port {
            Some(port) => Some(port),
            None if flags.vm_options => self.assign_debug_port(&layout, &meta.id)?,
            None => None,
        };
        signals.cleanup_stale(STALE_STOP_REQUEST_MINUTES);

        let marker = InstanceMarker::for_layout(&layout);
        let was_running = marker.is_present();
        let mut stopped = false;

        if was_running && options.stop_if_running {
            advance(&mut phase, SyncPhase::Stopping);
            let timeout_secs = options.wait.timeout.as_secs();
            let sync_types = flags
                .kinds()
                .iter()
                .map(|k| k.as_str().to_string())
                .collect();
            signals.write_stop_request(&StopRequest::new(
                options.auto_restart,
                sync_types,
                timeout_secs,
            ))?;
            on_progress(SyncProgress::StopRequested { timeout_secs });

            let outcome = ShutdownWaiter::new(options.wait)
                .wait(&marker, |elapsed_secs| {
                    on_progress(SyncProgress::WaitingForShutdown {
                        elapsed_secs,
                        timeout_secs,
                    })
                })
                .await;
            if outcome == WaitOutcome::Timeout {
                advance(
                    &mut phase,
                    SyncPhase::Failed {
                        reason: "shutdown timeout".to_string(),
                    },
                );
                return Err(JugglerError::ShutdownTimeout {
                    project: meta.name.clone(),
                    timeout_secs,
                });
            }
            stopped = true;
            on_progress(SyncProgress::InstanceStopped);
        } else if was_running {
            warn!(id = %meta.id, "instance is running, syncing its live directories");
            on_progress(SyncProgress::Warning(
                "instance is running; changes apply after it restarts".to_string(),
            ));
        }

        advance(&mut phase, SyncPhase::Syncing);
        let mut synced = Vec::new();
        if let Err(e) = self.apply_sync(
            &config,
            &layout,
            flags,
            debug_port,
            &mut synced,
            &mut on_progress,
        ) {
            advance(
                &mut phase,
                SyncPhase::Failed {
                    reason: e.to_string(),
                },
            );
            // Do not leave an instance we stopped down because a copy failed.
            if stopped && options.auto_restart {
                self.restart(&signals, &identity, &mut on_progress);
            }
            return Err(e);
        }

        let mut restart = RestartOutcome::NotRequested;
        if stopped && options.auto_restart {
            advance(&mut phase, SyncPhase::Restarting);
            restart = self.restart(&signals, &identity, &mut on_progress);
        }

        advance(&mut phase, SyncPhase::Done);
        drop(session);
        info!(id = %meta.id, synced = ?synced, "sync complete");

        Ok(SyncReport {
            project_id: meta.id,
            phase,
            was_running,
            stopped,
            synced,
            restart,
        })
    }

    /// Forget a project and delete its isolated directories.
    pub fn clean(&self, id: &str) -> Result<bool> {
        self.registry.remove(id)
    }
}
