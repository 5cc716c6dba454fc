use clap::{CommandFactory, Parser};
use clap_complete::aot::generate;
use juggler::cli::{Cli, Commands};
use juggler::commands;
use juggler::config::resolve::resolve_home;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.global.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "juggler", &mut std::io::stdout());
        return Ok(());
    }

    let home = resolve_home(cli.global.home.as_deref())?;
    match cli.command {
        Commands::Open { path } => commands::open::run(&home, &path),
        Commands::List => commands::list::run(&home),
        Commands::Status { project } => commands::status::run(&home, &project),
        Commands::Sync(args) => commands::sync::run(&home, args).await,
        Commands::Clean { projects, stale } => commands::clean::run(&home, &projects, stale),
        Commands::Config { command } => commands::config::run(&home, command),
        Commands::Completions { .. } => Ok(()),
    }
}
