//! HTTP surface for the HubSpot integration.
//!
//! Routes mirror the frontend contract:
//! - `POST /integrations/hubspot/authorize`      form `user_id`, `org_id` → URL
//! - `GET  /integrations/hubspot/oauth2callback` provider redirect → HTML
//! - `POST /integrations/hubspot/credentials`    form `user_id`, `org_id` → credentials
//! - `POST /integrations/hubspot/load`           form `credentials`, `cursor`, `page_size` → items

use crate::aggregator::{Aggregator, ItemsPage};
use crate::config::BridgeConfig;
use crate::credentials::{CredentialCache, CredentialCipher, Credentials};
use crate::error::IntegrationError;
use crate::hubspot::{HubSpotClient, RetryPolicy};
use crate::oauth::{AuthorizationFlow, CallbackParams};
use crate::store::KvStore;
use anyhow::Context;
use axum::{
    extract::{rejection::FormRejection, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, warn};

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// HTTP-facing wrapper around [`IntegrationError`]
struct AppError(IntegrationError);

impl From<IntegrationError> for AppError {
    fn from(err: IntegrationError) -> Self {
        AppError(err)
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError(IntegrationError::BadRequest(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IntegrationError::BadRequest(_) => StatusCode::BAD_REQUEST,
            IntegrationError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            IntegrationError::Upstream { .. } | IntegrationError::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
            IntegrationError::Store(_) | IntegrationError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(error = %self.0, "Request rejected");
        }

        let body = Json(ErrorResponse {
            detail: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub flow: AuthorizationFlow,
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    /// Wire the flow and aggregator from configuration and a store backend.
    pub fn from_config(config: &BridgeConfig, store: Arc<dyn KvStore>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hubspot-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let mut cache = CredentialCache::new(
            store,
            config.store.state_ttl(),
            config.store.credentials_ttl(),
        );
        if let Some(key) = &config.store.encryption_key {
            let cipher = CredentialCipher::from_base64(key).context("Invalid encryption key")?;
            cache = cache.with_cipher(cipher);
        }

        let flow = AuthorizationFlow::new(Arc::new(config.hubspot.clone()), cache, http.clone());
        let client = HubSpotClient::new(
            http,
            config.hubspot.api_base_url.clone(),
            config.hubspot.app_base_url.clone(),
            RetryPolicy::from(&config.fetch),
        );
        let aggregator = Arc::new(Aggregator::new(client, config.fetch.clone()));

        Ok(Self { flow, aggregator })
    }
}

/// Form body identifying the user
#[derive(Debug, Deserialize)]
pub struct UserForm {
    pub user_id: String,
    pub org_id: String,
}

/// Form body of the load endpoint
#[derive(Debug, Deserialize)]
pub struct LoadForm {
    /// Credentials JSON as returned by the credentials endpoint
    pub credentials: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub cursor: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page_size: Option<usize>,
}

/// Blank form fields count as absent.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Create the integration router
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/integrations/hubspot/authorize", post(authorize))
        .route("/integrations/hubspot/oauth2callback", get(oauth2callback))
        .route("/integrations/hubspot/credentials", post(credentials))
        .route("/integrations/hubspot/load", post(load))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// POST /integrations/hubspot/authorize
async fn authorize(
    State(state): State<Arc<AppState>>,
    form: Result<Form<UserForm>, FormRejection>,
) -> Result<Json<String>, AppError> {
    let Form(form) = form?;
    let url = state.flow.authorize(&form.user_id, &form.org_id).await?;
    Ok(Json(url))
}

/// GET /integrations/hubspot/oauth2callback
async fn oauth2callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, AppError> {
    debug!("OAuth callback received");
    let html = state.flow.handle_callback(params).await?;
    Ok(Html(html))
}

/// POST /integrations/hubspot/credentials
async fn credentials(
    State(state): State<Arc<AppState>>,
    form: Result<Form<UserForm>, FormRejection>,
) -> Result<Json<Credentials>, AppError> {
    let Form(form) = form?;
    let credentials = state
        .flow
        .consume_credentials(&form.user_id, &form.org_id)
        .await?;
    Ok(Json(credentials))
}

/// POST /integrations/hubspot/load
async fn load(
    State(state): State<Arc<AppState>>,
    form: Result<Form<LoadForm>, FormRejection>,
) -> Result<Json<ItemsPage>, AppError> {
    let Form(form) = form?;
    let credentials = Credentials::from_json(&form.credentials)?;
    let page = state
        .aggregator
        .list_items(&credentials, form.cursor.as_deref(), form.page_size)
        .await?;
    Ok(Json(page))
}
