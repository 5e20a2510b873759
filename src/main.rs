use std::sync::Arc;

use clap::{Parser, Subcommand};
use pollwatch::{
    cmd::{self, CheckArgs, CurrentArgs},
    config::AppConfig,
    persistence::sqlite::SqliteStateRepository,
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing `app.yaml`.
    #[arg(long, global = true, default_value = "configs")]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs every timer-enabled poller and the HTTP server.
    Run,
    /// Runs a single on-demand pass of one poller.
    Check(CheckArgs),
    /// Prints the live snapshot of one poller.
    Current(CurrentArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    tracing::debug!(config_dir = %cli.config_dir, "Loading application configuration...");
    let config = AppConfig::new(Some(&cli.config_dir))?;
    tracing::debug!(
        database_url = %config.database_url,
        pollers = ?config.pollers.keys().collect::<Vec<_>>(),
        "Configuration loaded."
    );

    match cli.command {
        Commands::Run => run_supervisor(config).await?,
        Commands::Check(args) => {
            cmd::check::execute(config, args).await?;
        }
        Commands::Current(args) => {
            cmd::current::execute(config, args).await?;
        }
    }

    Ok(())
}

async fn run_supervisor(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Initializing state store...");
    let repo = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;

    let supervisor = Supervisor::builder()
        .config(config)
        .state(Arc::clone(&repo))
        .build()
        .await?;
    tracing::info!(
        pollers = supervisor.poller_names().count(),
        "Supervisor initialized, starting pollers..."
    );

    supervisor.run().await?;
    repo.close().await;

    Ok(())
}
