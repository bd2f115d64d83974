mod admin;
mod status;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pulseboard-cli", about = "Operational tooling for pulseboard")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed companies and mappings from the YAML configuration file.
    Seed {
        /// Path to the companies file; defaults to the configured path.
        #[arg(long)]
        file: Option<std::path::PathBuf>,
    },
    /// Run a synchronization cycle now.
    Sync {
        /// Restrict the run to one company by slug.
        #[arg(long)]
        company: Option<String>,
    },
    /// Show per-platform sync status for all or one company.
    Status {
        /// Restrict to one company by slug.
        #[arg(long)]
        company: Option<String>,
    },
    /// Delete cache entries and portfolio records past retention.
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pulseboard_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pulseboard_db::PoolConfig::from_app_config(&config);
    let pool = pulseboard_db::connect_pool(&config.database_url, pool_config).await?;
    pulseboard_db::run_migrations(&pool).await?;

    let cli = Cli::parse();
    match cli.command {
        Command::Seed { file } => admin::run_seed(&pool, &config, file.as_deref()).await,
        Command::Sync { company } => sync::run_sync(&pool, &config, company.as_deref()).await,
        Command::Status { company } => status::run_status(&pool, company.as_deref()).await,
        Command::Sweep => admin::run_sweep(&pool, &config).await,
    }
}
