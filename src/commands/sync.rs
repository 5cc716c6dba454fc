use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

use crate::cli::SyncArgs;
use crate::orchestrator::shutdown::WaitPolicy;
use crate::orchestrator::{
    Orchestrator, RestartOutcome, SyncFlags, SyncOptions, SyncProgress,
};
use crate::platform::resolve_user_path;

/// Parts named on the command line; none (or `--all`) means every part.
pub fn flags_from_args(args: &SyncArgs) -> SyncFlags {
    let flags = SyncFlags {
        vm_options: args.vmoptions,
        config: args.config,
        plugins: args.plugins,
    };
    if args.all || flags.is_empty() {
        SyncFlags::all()
    } else {
        flags
    }
}

fn describe(progress: &SyncProgress) -> String {
    match progress {
        SyncProgress::StopRequested { timeout_secs } => {
            format!("Asked the running instance to exit (waiting up to {timeout_secs}s)")
        }
        SyncProgress::WaitingForShutdown {
            elapsed_secs,
            timeout_secs,
        } => format!("Waiting for shutdown... {elapsed_secs}s/{timeout_secs}s"),
        SyncProgress::InstanceStopped => "Instance stopped".to_string(),
        SyncProgress::Synced(kind) => format!("Synced {kind}"),
        SyncProgress::Restarted => "Instance restarted".to_string(),
        SyncProgress::RestartFailed(reason) => format!("Restart failed: {reason}"),
        SyncProgress::Warning(message) => message.clone(),
    }
}

pub async fn run(home: &Path, args: SyncArgs) -> Result<()> {
    let orchestrator = Orchestrator::open(home.to_path_buf())?;
    let path = resolve_user_path(&args.path);

    let timeout = args.timeout.unwrap_or_else(|| {
        Duration::from_secs(orchestrator.config().snapshot().shutdown_timeout_secs)
    });
    let options = SyncOptions {
        stop_if_running: !args.no_stop,
        auto_restart: !args.no_restart,
        wait: WaitPolicy::with_timeout(timeout),
    };

    let use_color = std::io::stderr().is_terminal();
    let report = orchestrator
        .sync(&path, flags_from_args(&args), options, |progress| {
            let line = describe(&progress);
            let failed = matches!(
                progress,
                SyncProgress::RestartFailed(_) | SyncProgress::Warning(_)
            );
            if use_color && failed {
                eprintln!("  {}", line.yellow());
            } else {
                eprintln!("  {}", line);
            }
        })
        .await
        .with_context(|| format!("syncing {}", path.display()))?;

    let parts: Vec<&str> = report.synced.iter().map(|k| k.as_str()).collect();
    println!("Synced {} for project {}", parts.join(", "), report.project_id);
    if report.stopped && report.restart == RestartOutcome::NotRequested {
        println!("The instance was left stopped; run `juggler open` to start it again.");
    }
    if let RestartOutcome::Failed(_) = report.restart {
        println!("Run `juggler open {}` to start it manually.", path.display());
    }
    Ok(())
}
