//! The `seed` and `sweep` subcommands.

use std::path::Path;

use chrono::Utc;
use sqlx::PgPool;

use pulseboard_core::AppConfig;

/// Load the companies file and upsert companies and mappings.
pub(crate) async fn run_seed(
    pool: &PgPool,
    config: &AppConfig,
    file: Option<&Path>,
) -> anyhow::Result<()> {
    let path = file.unwrap_or(config.companies_path.as_path());
    let companies = pulseboard_core::load_companies(path)?;

    let (company_count, mapping_count) = pulseboard_db::seed_companies(pool, &companies).await?;
    println!("seeded {company_count} companies with {mapping_count} mappings from {}", path.display());
    Ok(())
}

/// Delete cache entries and portfolio records past the retention window.
pub(crate) async fn run_sweep(pool: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let retention = config.cache_policy().retention;

    let cache_cutoff = Utc::now() - retention;
    let swept = pulseboard_db::cache::sweep_entries(pool, cache_cutoff).await?;

    let portfolio_cutoff = (Utc::now() - retention).date_naive();
    let pruned = pulseboard_db::portfolio::prune_portfolios(pool, portfolio_cutoff).await?;

    println!("swept {swept} cache entries and {pruned} portfolio records");
    Ok(())
}
