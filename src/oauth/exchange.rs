//! OAuth token exchange logic.
//!
//! Handles exchanging authorization codes for access tokens.

use crate::config::HubSpotConfig;
use crate::credentials::Credentials;
use crate::error::{IntegrationError, Result};
use tracing::{debug, error};

/// Exchange an authorization code for credentials with one form POST.
///
/// Every failure, the transport included, is reported as `BadRequest`;
/// details are logged but not returned.
pub async fn exchange_code_for_token(
    http: &reqwest::Client,
    config: &HubSpotConfig,
    code: &str,
) -> Result<Credentials> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("code", code),
    ];

    debug!("Exchanging authorization code for token at {}", config.token_url);

    let response = http
        .post(&config.token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| {
            error!(error = %e, "Token endpoint unreachable");
            IntegrationError::bad_request("Failed to get access token")
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = status.as_u16(), body = %body, "Token exchange rejected");
        return Err(IntegrationError::bad_request("Failed to get access token"));
    }

    let credentials: Credentials = response.json().await.map_err(|e| {
        error!(error = %e, "Token exchange returned an unreadable body");
        IntegrationError::bad_request("Failed to get access token")
    })?;

    debug!(
        has_refresh_token = credentials.refresh_token.is_some(),
        expires_in = ?credentials.expires_in,
        "Token exchange successful"
    );

    Ok(credentials)
}
