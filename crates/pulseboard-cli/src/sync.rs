//! The `sync` subcommand: run one orchestrator cycle from the terminal.

use std::sync::Arc;

use sqlx::PgPool;

use pulseboard_core::AppConfig;
use pulseboard_engine::{ItemStatus, SyncOrchestrator, SyncScope};
use pulseboard_providers::ProviderRegistry;

/// Build the orchestrator over the Postgres-backed stores.
pub(crate) fn build_orchestrator(
    pool: &PgPool,
    config: &AppConfig,
) -> anyhow::Result<SyncOrchestrator> {
    let providers = ProviderRegistry::from_config(config)?;
    if providers.is_empty() {
        tracing::warn!("no provider API keys configured; fetches will fail per platform");
    }

    Ok(SyncOrchestrator::new(
        Arc::new(pulseboard_db::PgNormalizedStore::new(pool.clone())),
        Arc::new(pulseboard_db::PgCacheStore::new(pool.clone())),
        Arc::new(pulseboard_db::PgStatusStore::new(pool.clone())),
        Arc::new(pulseboard_db::PgRunStore::new(pool.clone())),
        Arc::new(pulseboard_db::PgDirectory::new(pool.clone())),
        providers,
        config.batch_policy(),
        config.cache_policy(),
        config.default_range_days,
    ))
}

/// Resolve the scope and run one cycle, reporting per-item outcomes.
pub(crate) async fn run_sync(
    pool: &PgPool,
    config: &AppConfig,
    company_slug: Option<&str>,
) -> anyhow::Result<()> {
    let scope = match company_slug {
        Some(slug) => {
            let company = pulseboard_db::get_company_by_slug(pool, slug)
                .await?
                .ok_or_else(|| anyhow::anyhow!("company '{slug}' not found"))?;
            SyncScope::Companies(vec![company.id])
        }
        None => SyncScope::All,
    };

    let orchestrator = build_orchestrator(pool, config)?;
    let report = orchestrator.run(scope, "cli").await?;

    for outcome in &report.outcomes {
        match outcome.status {
            ItemStatus::Success => tracing::info!(
                company_id = outcome.company_id,
                platforms = outcome.platforms_synced.len(),
                duration_ms = outcome.duration_ms,
                "company synced"
            ),
            ItemStatus::Error => tracing::error!(
                company_id = outcome.company_id,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "company failed"
            ),
            ItemStatus::Skipped => tracing::warn!(
                company_id = outcome.company_id,
                "company skipped (no mappings)"
            ),
        }
    }

    println!(
        "sync complete: {} succeeded, {} failed, {} skipped in {}ms over {} batches",
        report.succeeded,
        report.failed,
        report.skipped,
        report.duration_ms,
        report.batches.len()
    );

    if report.all_failed() {
        anyhow::bail!("all companies failed to sync");
    }
    Ok(())
}
