//! HubSpot CRM integration: OAuth2 login, short-lived credential caching and
//! merged, paginated listing of contacts, companies and deals.

// Normalized item model and record normalization
pub mod items;

// Error taxonomy
pub mod error;

// Configuration loading
pub mod config;

// Key-value store seam and backends
pub mod store;

// Cached credentials
pub mod credentials;

// OAuth authorization-code flow
pub mod oauth;

// HubSpot CRM API client
pub mod hubspot;

// Merged pagination across feeds
pub mod aggregator;

// HTTP endpoints
pub mod api;

pub use aggregator::{Aggregator, CombinedCursor, ItemsPage};
pub use credentials::Credentials;
pub use error::{IntegrationError, Result};
pub use items::{IntegrationItem, ItemType};
pub use oauth::{AuthState, AuthorizationFlow};
