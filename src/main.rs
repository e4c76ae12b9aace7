use std::time::Duration;

use littlechef_api::{
    api::{create_router, AppState, Backends},
    config::{Config, StorageBackend},
    db::{self, Cache},
    services::session_reaper,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "littlechef_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        storage = ?config.storage,
        replay_policy = ?config.replay_policy,
        seeded = config.rng_seed.is_some(),
        "Configuration loaded"
    );

    let mut cache_writer = None;
    let backends = match config.storage {
        StorageBackend::Memory => Backends::memory(Vec::new()),
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config.database_url).await?;
            db::postgres::run_migrations(&pool).await?;

            let cache = match &config.redis_url {
                Some(url) => {
                    let (cache, handle) = Cache::new(db::create_redis_client(url)?);
                    cache_writer = Some(handle);
                    Some((cache, config.catalog_cache_ttl_secs))
                }
                None => None,
            };

            Backends::postgres(pool, cache, config.store_retry_attempts)
        }
    };

    let reaper = config.session_ttl().map(|ttl| {
        session_reaper::spawn(
            backends.sessions.clone(),
            ttl,
            Duration::from_secs(config.reaper_interval_secs.max(1)),
        )
    });

    let app = create_router(AppState::from_config(&backends, &config));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(reaper) = reaper {
        reaper.shutdown().await;
    }
    if let Some(cache_writer) = cache_writer {
        cache_writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
