use super::{CredentialCipher, Credentials};
use crate::error::{IntegrationError, Result};
use crate::oauth::AuthState;
use crate::store::{auth_state_key, credentials_key, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Keyed cache for pending logins and freshly exchanged credentials.
#[derive(Clone)]
pub struct CredentialCache {
    store: Arc<dyn KvStore>,
    cipher: Option<CredentialCipher>,
    state_ttl: Duration,
    credentials_ttl: Duration,
}

impl CredentialCache {
    pub fn new(store: Arc<dyn KvStore>, state_ttl: Duration, credentials_ttl: Duration) -> Self {
        Self {
            store,
            cipher: None,
            state_ttl,
            credentials_ttl,
        }
    }

    /// Seal credentials before they reach the store.
    pub fn with_cipher(mut self, cipher: CredentialCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub async fn put_state(&self, state: &AuthState) -> Result<()> {
        let value = serde_json::to_string(state)
            .map_err(|e| IntegrationError::Internal(format!("Failed to encode state: {}", e)))?;
        self.store
            .set(
                &auth_state_key(&state.org_id, &state.user_id),
                &value,
                self.state_ttl,
            )
            .await
            .map_err(IntegrationError::Store)
    }

    /// Pending state for a user, if one is stored and readable.
    pub async fn get_state(&self, org_id: &str, user_id: &str) -> Result<Option<AuthState>> {
        let raw = self
            .store
            .get(&auth_state_key(org_id, user_id))
            .await
            .map_err(IntegrationError::Store)?;

        Ok(raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(org_id, user_id, error = %e, "Discarding unreadable pending state");
                None
            }
        }))
    }

    pub async fn delete_state(&self, org_id: &str, user_id: &str) -> Result<()> {
        self.store
            .delete(&auth_state_key(org_id, user_id))
            .await
            .map_err(IntegrationError::Store)
    }

    pub async fn put_credentials(
        &self,
        org_id: &str,
        user_id: &str,
        credentials: &Credentials,
    ) -> Result<()> {
        let json = serde_json::to_string(credentials).map_err(|e| {
            IntegrationError::Internal(format!("Failed to encode credentials: {}", e))
        })?;
        let value = match &self.cipher {
            Some(cipher) => cipher
                .seal(&json)
                .map_err(|e| IntegrationError::Internal(format!("{:#}", e)))?,
            None => json,
        };

        debug!(org_id, user_id, sealed = self.cipher.is_some(), "Caching credentials");
        self.store
            .set(&credentials_key(org_id, user_id), &value, self.credentials_ttl)
            .await
            .map_err(IntegrationError::Store)
    }

    /// Read and delete cached credentials.
    ///
    /// Fails with `BadRequest` when nothing is cached, so a second call for
    /// the same user fails until a new login completes.
    pub async fn take_credentials(&self, org_id: &str, user_id: &str) -> Result<Credentials> {
        let key = credentials_key(org_id, user_id);
        let raw = self
            .store
            .get(&key)
            .await
            .map_err(IntegrationError::Store)?
            .ok_or_else(|| IntegrationError::bad_request("No credentials found."))?;

        self.store
            .delete(&key)
            .await
            .map_err(IntegrationError::Store)?;

        let json = match &self.cipher {
            Some(cipher) => cipher
                .open(&raw)
                .map_err(|e| IntegrationError::Internal(format!("{:#}", e)))?,
            None => raw,
        };

        serde_json::from_str(&json).map_err(|e| {
            IntegrationError::Internal(format!("Cached credentials are unreadable: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    const TTL: Duration = Duration::from_secs(600);

    fn cache(store: &MemoryStore) -> CredentialCache {
        CredentialCache::new(Arc::new(store.clone()), TTL, TTL)
    }

    fn creds(token: &str) -> Credentials {
        Credentials {
            access_token: Some(token.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_state_roundtrip_and_delete() {
        let store = MemoryStore::new();
        let cache = cache(&store);
        let state = AuthState::new("alice", "acme");

        cache.put_state(&state).await.unwrap();
        assert_eq!(cache.get_state("acme", "alice").await.unwrap(), Some(state));
        assert_eq!(cache.get_state("acme", "bob").await.unwrap(), None);

        cache.delete_state("acme", "alice").await.unwrap();
        assert_eq!(cache.get_state("acme", "alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_credentials_are_single_use() {
        let store = MemoryStore::new();
        let cache = cache(&store);

        cache.put_credentials("acme", "alice", &creds("tok")).await.unwrap();

        let first = cache.take_credentials("acme", "alice").await.unwrap();
        assert_eq!(first.access_token.as_deref(), Some("tok"));

        let second = cache.take_credentials("acme", "alice").await;
        assert!(matches!(second, Err(IntegrationError::BadRequest(msg)) if msg == "No credentials found."));
    }

    #[tokio::test]
    async fn test_sealed_credentials_not_stored_in_clear() {
        let store = MemoryStore::new();
        let cipher = CredentialCipher::from_base64(&BASE64.encode([7u8; 32])).unwrap();
        let cache = cache(&store).with_cipher(cipher);

        cache.put_credentials("acme", "alice", &creds("very-secret")).await.unwrap();

        let raw = store.get(&credentials_key("acme", "alice")).await.unwrap().unwrap();
        assert!(!raw.contains("very-secret"));

        let back = cache.take_credentials("acme", "alice").await.unwrap();
        assert_eq!(back.access_token.as_deref(), Some("very-secret"));
    }

    #[tokio::test]
    async fn test_expired_credentials_not_found() {
        let store = MemoryStore::new();
        let cache = CredentialCache::new(Arc::new(store.clone()), TTL, Duration::from_millis(20));

        cache.put_credentials("acme", "alice", &creds("tok")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(matches!(
            cache.take_credentials("acme", "alice").await,
            Err(IntegrationError::BadRequest(_))
        ));
    }
}
