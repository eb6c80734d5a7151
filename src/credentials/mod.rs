//! Credentials returned by the HubSpot token exchange, and the short-lived
//! cache that holds them (together with pending logins) in the key-value store.
//!
//! ```text
//!  authorize ──► auth_state:{org}:{user}   (600s)
//!  callback  ──► credentials:{org}:{user}  (600s, optionally AES-256-GCM sealed)
//!  consume   ──► read + delete
//! ```

use crate::error::{IntegrationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod cache;
mod encryption;

pub use cache::CredentialCache;
pub use encryption::CredentialCipher;

/// Token exchange response, kept verbatim.
///
/// The well-known OAuth fields are typed; anything else HubSpot sends
/// (`hub_id`, `scopes`, ...) survives in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Lifetime of the access token in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    /// Bearer token for API calls.
    pub fn bearer_token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| IntegrationError::bad_request("Invalid access token"))
    }

    /// Parse the JSON blob a client sends back to us.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| IntegrationError::bad_request(format!("Malformed credentials: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{
            "access_token": "CJSP5qf1KhICAQEYs-gDIIGOBii1",
            "refresh_token": "6f18f21e-a743-4509-b7fd-1a5e632fffa1",
            "expires_in": 1800,
            "token_type": "bearer",
            "hub_id": 1234567
        }"#;

        let creds: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.access_token.as_deref(), Some("CJSP5qf1KhICAQEYs-gDIIGOBii1"));
        assert_eq!(creds.expires_in, Some(1800));
        assert_eq!(creds.extra["hub_id"], 1234567);

        // Unknown fields are written back out
        let back = serde_json::to_value(&creds).unwrap();
        assert_eq!(back["hub_id"], 1234567);
        assert_eq!(back["token_type"], "bearer");
    }

    #[test]
    fn test_bearer_token_required() {
        let creds = Credentials::from_json(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(creds.bearer_token().unwrap(), "abc");

        for raw in [r#"{}"#, r#"{"access_token": ""}"#, r#"{"refresh_token": "r"}"#] {
            let creds = Credentials::from_json(raw).unwrap();
            assert!(matches!(
                creds.bearer_token(),
                Err(IntegrationError::BadRequest(msg)) if msg == "Invalid access token"
            ));
        }
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        assert!(matches!(
            Credentials::from_json("not json"),
            Err(IntegrationError::BadRequest(_))
        ));
    }
}
