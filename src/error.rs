//! Error taxonomy for the HubSpot integration.

use crate::items::ItemType;

/// Errors surfaced by the authorization flow, the fetcher and the aggregator.
///
/// Rate limiting is retried inside the fetcher and only shows up here once
/// the attempt budget is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// Caller-side problem: state mismatch, missing credentials, provider
    /// reported an authorization error, unusable access token.
    #[error("{0}")]
    BadRequest(String),

    /// HubSpot answered with a status other than 200 or 429.
    #[error("HubSpot returned status {status} while listing {resource} records")]
    Upstream { status: u16, resource: ItemType },

    /// HubSpot kept answering 429 for every allowed attempt.
    #[error("HubSpot rate limit persisted for {resource} records after {attempts} attempts")]
    RateLimited { resource: ItemType, attempts: u32 },

    /// The request never produced a usable response (connect, TLS, body decode).
    #[error("HubSpot request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The key-value store backend failed.
    #[error("key-value store error: {0:#}")]
    Store(anyhow::Error),

    /// Serialization or sealing failure inside this service.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntegrationError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        IntegrationError::BadRequest(message.into())
    }
}

pub type Result<T> = std::result::Result<T, IntegrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = IntegrationError::Upstream {
            status: 503,
            resource: ItemType::Deal,
        };
        assert_eq!(
            err.to_string(),
            "HubSpot returned status 503 while listing Deal records"
        );

        let err = IntegrationError::RateLimited {
            resource: ItemType::Contact,
            attempts: 5,
        };
        assert!(err.to_string().contains("after 5 attempts"));

        let err = IntegrationError::bad_request("State does not match.");
        assert_eq!(err.to_string(), "State does not match.");
    }

    #[test]
    fn test_store_error_keeps_chain() {
        let inner = anyhow::anyhow!("connection refused").context("Failed to GET key");
        let err = IntegrationError::Store(inner);
        let message = err.to_string();
        assert!(message.contains("Failed to GET key"));
        assert!(message.contains("connection refused"));
    }
}
