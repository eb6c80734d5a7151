use anyhow::{Context, Result};
use hubspot_bridge::api::{create_router, AppState};
use hubspot_bridge::config::{self, StoreBackend};
use hubspot_bridge::store::{run_store_cleanup, KvStore, MemoryStore, RedisStore};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hubspot_bridge=info".into()),
        )
        .init();

    info!("HubSpot bridge starting...");

    let config = config::load_from_env()?;
    config.validate()?;

    let store: Arc<dyn KvStore> = match config.store.backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            tokio::spawn(run_store_cleanup(
                store.clone(),
                config.store.cleanup_interval_seconds,
            ));
            info!("Using in-memory key-value store");
            Arc::new(store)
        }
        StoreBackend::Redis => Arc::new(RedisStore::connect(&config.store.redis_url).await?),
    };

    let state = AppState::from_config(&config, store)?;
    let app = create_router(state, &config.server.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("HubSpot bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
