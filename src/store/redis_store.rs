use super::KvStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed store.
///
/// Uses a [`ConnectionManager`], which reconnects on its own; clones of the
/// manager share one multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    connection_manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to `redis_url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).context("Invalid Redis URL")?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Redis connection established");

        Ok(Self { connection_manager })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        debug!(key, ttl_seconds = ttl.as_secs(), "SET EX");
        let mut conn = self.connection_manager.clone();
        // SET EX rejects a zero expiry
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .with_context(|| format!("Failed to SET {}", key))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection_manager.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .with_context(|| format!("Failed to GET {}", key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        debug!(key, "DEL");
        let mut conn = self.connection_manager.clone();
        conn.del::<_, ()>(key)
            .await
            .with_context(|| format!("Failed to DEL {}", key))
    }
}
