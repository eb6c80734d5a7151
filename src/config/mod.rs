use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Complete bridge configuration.
///
/// Loaded once at startup and shared read-only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hubspot: HubSpotConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Origins allowed by CORS (the frontend)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// HubSpot app registration and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct HubSpotConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Base of the CRM REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Base of the HubSpot web app, used for record links
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_redirect_uri() -> String {
    "http://localhost:8000/integrations/hubspot/oauth2callback".to_string()
}

fn default_auth_url() -> String {
    "https://app.hubspot.com/oauth/authorize".to_string()
}

fn default_token_url() -> String {
    "https://api.hubapi.com/oauth/v1/token".to_string()
}

fn default_api_base_url() -> String {
    "https://api.hubapi.com".to_string()
}

fn default_app_base_url() -> String {
    "https://app.hubspot.com".to_string()
}

fn default_scopes() -> Vec<String> {
    [
        "crm.objects.contacts.read",
        "crm.objects.contacts.write",
        "crm.objects.companies.read",
        "crm.objects.companies.write",
        "crm.objects.deals.read",
        "crm.objects.deals.write",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            app_base_url: default_app_base_url(),
            scopes: default_scopes(),
        }
    }
}

/// Which key-value store backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

/// Key-value store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_ttl")]
    pub state_ttl_seconds: u64,
    #[serde(default = "default_ttl")]
    pub credentials_ttl_seconds: u64,
    /// Purge interval for the memory backend
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// Base64 32-byte key; when set, cached credentials are sealed
    #[serde(default)]
    pub encryption_key: Option<String>,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_ttl() -> u64 {
    600
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: default_redis_url(),
            state_ttl_seconds: default_ttl(),
            credentials_ttl_seconds: default_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
            encryption_key: None,
        }
    }
}

impl StoreConfig {
    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_seconds)
    }

    pub fn credentials_ttl(&self) -> Duration {
        Duration::from_secs(self.credentials_ttl_seconds)
    }
}

/// Paging and rate-limit handling for CRM list calls
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// HubSpot caps list pages at 100 records
    #[serde(default = "default_page_size")]
    pub max_page_size: usize,
    /// Total attempts per page request, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait used when a 429 carries no Retry-After header
    #[serde(default = "default_retry_after")]
    pub default_retry_after_seconds: u64,
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_seconds: u64,
}

fn default_page_size() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_after() -> u64 {
    10
}

fn default_base_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    60
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_page_size(),
            max_attempts: default_max_attempts(),
            default_retry_after_seconds: default_retry_after(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_seconds: default_max_backoff(),
        }
    }
}

impl FetchConfig {
    /// Requested page size, defaulted and clamped to `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

impl BridgeConfig {
    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("HUBSPOT_CLIENT_ID") {
            self.hubspot.client_id = v;
        }
        if let Ok(v) = std::env::var("HUBSPOT_CLIENT_SECRET") {
            self.hubspot.client_secret = v;
        }
        if let Ok(v) = std::env::var("HUBSPOT_REDIRECT_URI") {
            self.hubspot.redirect_uri = v;
        }
        if let Ok(v) = std::env::var("HUBSPOT_BRIDGE_LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Ok(v) = std::env::var("HUBSPOT_BRIDGE_REDIS_URL") {
            self.store.redis_url = v;
            self.store.backend = StoreBackend::Redis;
        }
        if let Ok(v) = std::env::var("HUBSPOT_BRIDGE_ENCRYPTION_KEY") {
            self.store.encryption_key = Some(v);
        }
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hubspot.client_id.trim().is_empty() || self.hubspot.client_secret.trim().is_empty() {
            bail!("HubSpot client credentials missing. Set HUBSPOT_CLIENT_ID and HUBSPOT_CLIENT_SECRET.");
        }
        if self.fetch.default_page_size == 0 || self.fetch.max_page_size == 0 {
            bail!("Page sizes must be at least 1");
        }
        if self.fetch.default_page_size > self.fetch.max_page_size {
            bail!(
                "default_page_size ({}) exceeds max_page_size ({})",
                self.fetch.default_page_size,
                self.fetch.max_page_size
            );
        }
        if self.fetch.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        Ok(())
    }
}

/// Load configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BridgeConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Load the file named by `HUBSPOT_BRIDGE_CONFIG` (default
/// `hubspot-bridge.toml`) if it exists, then apply environment overrides.
pub fn load_from_env() -> Result<BridgeConfig> {
    let path = std::env::var("HUBSPOT_BRIDGE_CONFIG")
        .unwrap_or_else(|_| "hubspot-bridge.toml".to_string());

    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        BridgeConfig::default()
    };
    config.apply_env();
    Ok(config)
}
