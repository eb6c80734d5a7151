//! OAuth 2.0 authorization-code flow against HubSpot.
//!
//! 1. Frontend calls `authorize` and opens the returned URL in a popup
//! 2. User approves the app on HubSpot
//! 3. HubSpot redirects the popup to our callback with `code` and `state`
//! 4. State is checked against the pending login, the code is exchanged and
//!    the credentials are cached; the popup closes itself
//! 5. Frontend picks the credentials up once with `consume_credentials`

mod exchange;
mod provider;
mod state;

pub use exchange::exchange_code_for_token;
pub use provider::build_auth_url;
pub use state::AuthState;

use crate::config::HubSpotConfig;
use crate::credentials::{CredentialCache, Credentials};
use crate::error::{IntegrationError, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Page returned to the popup once the flow completes.
pub const CLOSE_WINDOW_HTML: &str = r#"<html>
    <script>
        window.close();
    </script>
</html>
"#;

/// OAuth callback query parameters
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Authorization flow bound to one HubSpot app registration.
#[derive(Clone)]
pub struct AuthorizationFlow {
    config: Arc<HubSpotConfig>,
    cache: CredentialCache,
    http: reqwest::Client,
}

impl AuthorizationFlow {
    pub fn new(config: Arc<HubSpotConfig>, cache: CredentialCache, http: reqwest::Client) -> Self {
        Self { config, cache, http }
    }

    /// Record a pending login and return the HubSpot authorization URL.
    pub async fn authorize(&self, user_id: &str, org_id: &str) -> Result<String> {
        let state = AuthState::new(user_id, org_id);
        self.cache.put_state(&state).await?;

        info!(user_id, org_id, "Issued HubSpot authorization URL");
        Ok(build_auth_url(&self.config, &state.encode()))
    }

    /// Validate the provider redirect, exchange the code and cache the
    /// credentials. Returns the HTML that closes the popup.
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<String> {
        if let Some(error) = params.error {
            let description = params
                .error_description
                .unwrap_or_else(|| error.clone());
            warn!(error = %error, description = %description, "HubSpot reported an authorization error");
            return Err(IntegrationError::BadRequest(description));
        }

        let received = params
            .state
            .as_deref()
            .and_then(AuthState::decode)
            .ok_or_else(|| IntegrationError::bad_request("Invalid or missing 'state' parameter"))?;

        let saved = self
            .cache
            .get_state(&received.org_id, &received.user_id)
            .await?;

        match saved {
            Some(saved) if saved.matches(&received) => {}
            _ => {
                warn!(
                    user_id = %received.user_id,
                    org_id = %received.org_id,
                    "OAuth state does not match pending login"
                );
                return Err(IntegrationError::bad_request("State does not match."));
            }
        }

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| IntegrationError::bad_request("Missing 'code' parameter"))?;

        debug!(user_id = %received.user_id, org_id = %received.org_id, "State validated, exchanging code");
        let credentials = exchange_code_for_token(&self.http, &self.config, &code).await?;

        self.cache
            .delete_state(&received.org_id, &received.user_id)
            .await?;
        self.cache
            .put_credentials(&received.org_id, &received.user_id, &credentials)
            .await?;

        info!(
            user_id = %received.user_id,
            org_id = %received.org_id,
            has_refresh_token = credentials.refresh_token.is_some(),
            "HubSpot OAuth flow completed"
        );

        Ok(CLOSE_WINDOW_HTML.to_string())
    }

    /// One-time retrieval of the credentials cached by the callback.
    pub async fn consume_credentials(&self, user_id: &str, org_id: &str) -> Result<Credentials> {
        let credentials = self.cache.take_credentials(org_id, user_id).await?;
        debug!(user_id, org_id, "Handed out cached credentials");
        Ok(credentials)
    }
}
