mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pulseboard_engine::{spawn_refresh_worker, Resolver, SyncOrchestrator};
use pulseboard_providers::ProviderRegistry;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pulseboard_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pulseboard_db::PoolConfig::from_app_config(&config);
    let pool = pulseboard_db::connect_pool(&config.database_url, pool_config).await?;
    pulseboard_db::run_migrations(&pool).await?;

    let providers = ProviderRegistry::from_config(&config)?;
    if providers.is_empty() {
        tracing::warn!("no provider API keys configured; live fetches will be unavailable");
    }

    let normalized = Arc::new(pulseboard_db::PgNormalizedStore::new(pool.clone()));
    let cache = Arc::new(pulseboard_db::PgCacheStore::new(pool.clone()));
    let status = Arc::new(pulseboard_db::PgStatusStore::new(pool.clone()));
    let runs = Arc::new(pulseboard_db::PgRunStore::new(pool.clone()));
    let directory = Arc::new(pulseboard_db::PgDirectory::new(pool.clone()));
    let portfolio = Arc::new(pulseboard_db::PgPortfolioStore::new(pool.clone()));

    let orchestrator = Arc::new(SyncOrchestrator::new(
        normalized.clone(),
        cache.clone(),
        status,
        runs,
        directory.clone(),
        providers.clone(),
        config.batch_policy(),
        config.cache_policy(),
        config.default_range_days,
    ));

    let refresh = spawn_refresh_worker(Arc::clone(&orchestrator));
    let resolver = Arc::new(
        Resolver::new(
            normalized,
            cache,
            directory,
            portfolio,
            providers,
            config.cache_policy(),
            std::time::Duration::from_secs(config.provider_timeout_secs),
        )
        .with_refresh(refresh),
    );

    let _scheduler =
        scheduler::build_scheduler(pool.clone(), Arc::clone(&orchestrator), Arc::clone(&config))
            .await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        pulseboard_core::Environment::Development
    ))?;
    let state = AppState {
        pool,
        resolver,
        orchestrator,
        sync_secret: config.sync_secret.as_deref().map(Arc::from),
        default_range_days: config.default_range_days,
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
