//! Key-value store used for pending logins and short-lived credentials.
//!
//! The store is an external collaborator; this module only fixes the seam
//! ([`KvStore`]) and ships two backends:
//!
//! - [`MemoryStore`] - process-local, lazily expiring `DashMap`
//! - [`RedisStore`] - Redis `SET EX` / `GET` / `DEL`
//!
//! Each operation is atomic per key. No locking is layered on top.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

mod memory;
mod redis_store;

pub use memory::{run_store_cleanup, MemoryStore};
pub use redis_store::RedisStore;

/// Minimal get/set/delete store with per-key expiry.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value. The entry
    /// disappears after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Key of the pending authorization state for a user.
pub fn auth_state_key(org_id: &str, user_id: &str) -> String {
    format!("auth_state:{}:{}", org_id, user_id)
}

/// Key of the cached credentials for a user.
pub fn credentials_key(org_id: &str, user_id: &str) -> String {
    format!("credentials:{}:{}", org_id, user_id)
}
