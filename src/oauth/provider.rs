//! HubSpot authorization endpoint URL construction.

use crate::config::HubSpotConfig;

/// Build the authorization redirect URL for an encoded `state`.
pub fn build_auth_url(config: &HubSpotConfig, state: &str) -> String {
    let scopes = config.scopes.join(" ");
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&state={}&response_type=code",
        config.auth_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&scopes),
        urlencoding::encode(state)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_auth_url() {
        let config = HubSpotConfig {
            auth_url: "https://example.com/oauth/authorize".to_string(),
            client_id: "test_client_id".to_string(),
            redirect_uri: "http://localhost:8000/callback".to_string(),
            scopes: vec!["crm.objects.contacts.read".to_string(), "crm.objects.deals.read".to_string()],
            ..HubSpotConfig::default()
        };

        let url = build_auth_url(&config, "c3RhdGU");

        assert!(url.starts_with("https://example.com/oauth/authorize?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fcallback"));
        // URL encoding converts spaces to %20
        assert!(url.contains("scope=crm.objects.contacts.read%20crm.objects.deals.read"));
        assert!(url.contains("state=c3RhdGU"));
        assert!(url.contains("response_type=code"));
    }
}
