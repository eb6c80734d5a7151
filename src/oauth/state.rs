//! OAuth `state` parameter codec for CSRF protection.
//!
//! The state carries a random nonce together with the user and organization
//! that started the flow, so the callback can find the pending login again.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes in a nonce (256 bits)
const NONCE_BYTES: usize = 32;

/// Pending authorization attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(rename = "state")]
    pub nonce: String,
    pub user_id: String,
    pub org_id: String,
}

impl AuthState {
    /// Start a new attempt with a fresh nonce.
    pub fn new(user_id: &str, org_id: &str) -> Self {
        Self {
            nonce: generate_nonce(),
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
        }
    }

    /// Transport-safe form used as the `state` query parameter.
    pub fn encode(&self) -> String {
        // Serializing three strings cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Parse a `state` parameter. Padded and unpadded base64url are accepted.
    pub fn decode(encoded: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim().trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Constant-time nonce comparison.
    pub fn matches(&self, other: &AuthState) -> bool {
        let a = self.nonce.as_bytes();
        let b = other.nonce.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;

    #[test]
    fn test_encode_decode_roundtrip() {
        let state = AuthState::new("user-1", "org-9");
        let decoded = AuthState::decode(&state.encode()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_encoded_state_is_url_safe() {
        let encoded = AuthState::new("ü/+?", "org&=").encode();
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_nonces_are_unique() {
        let a = AuthState::new("u", "o");
        let b = AuthState::new("u", "o");
        assert_ne!(a.nonce, b.nonce);
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(a.nonce.len(), 43);
    }

    #[test]
    fn test_decode_accepts_padded_input() {
        let json = r#"{"state":"abc","user_id":"u1","org_id":"o1"}"#;
        let padded = URL_SAFE.encode(json);
        let decoded = AuthState::decode(&padded).unwrap();
        assert_eq!(decoded.nonce, "abc");
        assert_eq!(decoded.user_id, "u1");
        assert_eq!(decoded.org_id, "o1");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(AuthState::decode("").is_none());
        assert!(AuthState::decode("!!!not base64!!!").is_none());
        assert!(AuthState::decode(&URL_SAFE_NO_PAD.encode("[1,2,3]")).is_none());
    }

    #[test]
    fn test_matches_compares_nonce() {
        let state = AuthState::new("u", "o");
        let mut same = state.clone();
        assert!(state.matches(&same));
        same.nonce.push('x');
        assert!(!state.matches(&same));
        let other = AuthState::new("u", "o");
        assert!(!state.matches(&other));
    }
}
