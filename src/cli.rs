use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "juggler",
    version,
    about = "Run isolated IDE instances, one per project"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Juggler home directory (defaults to ~/.idea-juggler)
    #[arg(long, global = true, env = "JUGGLER_HOME")]
    pub home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open a project in its own IDE instance
    Open {
        /// Project directory
        path: PathBuf,
    },
    /// List tracked projects, most recently opened first
    #[command(alias = "ls")]
    List,
    /// Show a project's directories and whether its instance is running
    Status {
        /// Project directory or id prefix
        project: String,
    },
    /// Refresh a project's isolated copy from the base installation
    Sync(SyncArgs),
    /// Delete isolated projects
    Clean {
        /// Project directories or id prefixes
        #[arg(required_unless_present = "stale")]
        projects: Vec<String>,
        /// Remove every project whose directory no longer exists
        #[arg(long, conflicts_with = "projects")]
        stale: bool,
    },
    /// Show or change global settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::aot::Shell,
    },
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Project directory
    pub path: PathBuf,
    /// Regenerate the options file from the base file
    #[arg(long)]
    pub vmoptions: bool,
    /// Re-copy the base config directory
    #[arg(long)]
    pub config: bool,
    /// Re-copy the base plugins directory
    #[arg(long)]
    pub plugins: bool,
    /// Sync every part (the default when no part is named)
    #[arg(long)]
    pub all: bool,
    /// Do not stop a running instance; sync its directories in place
    #[arg(long)]
    pub no_stop: bool,
    /// Leave the instance stopped after syncing
    #[arg(long)]
    pub no_restart: bool,
    /// How long to wait for the instance to exit (e.g. 30s, 2m)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,
    /// Set the IDE launcher executable
    SetIdea { path: PathBuf },
    /// Set the base options file new projects derive from
    SetBaseVmoptions { path: PathBuf },
    /// Set the base config directory
    SetBaseConfig { path: PathBuf },
    /// Set the base plugins directory
    SetBasePlugins { path: PathBuf },
    /// Set the project that opens without isolation
    SetMainProject { path: PathBuf },
    /// Default time to wait for an instance to shut down (e.g. 90s)
    SetShutdownTimeout {
        #[arg(value_parser = humantime::parse_duration)]
        timeout: Duration,
    },
    /// Clear a setting
    Unset { key: ConfigKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigKey {
    Idea,
    BaseVmoptions,
    BaseConfig,
    BasePlugins,
    MainProject,
}
