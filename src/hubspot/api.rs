use super::backoff::{retry_after, RetryPolicy};
use crate::error::{IntegrationError, Result};
use crate::items::{normalize, IntegrationItem, ItemType};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// One page of normalized records from a single object feed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageResult {
    pub items: Vec<IntegrationItem>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// `GET /crm/v3/objects/{type}` envelope.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    #[serde(default)]
    after: Option<String>,
}

impl ListResponse {
    fn next_cursor(&self) -> Option<String> {
        self.paging
            .as_ref()?
            .next
            .as_ref()?
            .after
            .clone()
            .filter(|after| !after.is_empty())
    }
}

/// HTTP client for the HubSpot CRM v3 objects API.
///
/// The access token is supplied per call so one client serves every user.
#[derive(Clone)]
pub struct HubSpotClient {
    http_client: Client,
    api_base_url: String,
    app_base_url: String,
    retry: RetryPolicy,
}

impl HubSpotClient {
    pub fn new(
        http_client: Client,
        api_base_url: impl Into<String>,
        app_base_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.into(),
            app_base_url: app_base_url.into(),
            retry,
        }
    }

    /// List endpoint for one object type.
    pub fn resource_url(&self, item_type: ItemType) -> String {
        format!(
            "{}/crm/v3/objects/{}",
            self.api_base_url.trim_end_matches('/'),
            item_type.resource()
        )
    }

    /// Fetch one page of `item_type` records after `cursor`.
    ///
    /// 429 responses are retried per the [`RetryPolicy`]; only this task
    /// sleeps. Any other non-200 status fails with `Upstream`.
    pub async fn fetch_page(
        &self,
        access_token: &str,
        item_type: ItemType,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<PageResult> {
        let url = self.resource_url(item_type);
        let limit = page_size.to_string();
        let properties = item_type.properties().join(",");

        let mut query = vec![("limit", limit.as_str()), ("properties", properties.as_str())];
        if let Some(after) = cursor {
            query.push(("after", after));
        }

        let mut attempt = 1;
        let response = loop {
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(access_token)
                .query(&query)
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => break response,
                StatusCode::TOO_MANY_REQUESTS => {
                    if attempt >= self.retry.max_attempts {
                        warn!(resource = %item_type, attempts = attempt, "Rate limit retries exhausted");
                        return Err(IntegrationError::RateLimited {
                            resource: item_type,
                            attempts: attempt,
                        });
                    }
                    let delay = self.retry.delay(attempt, retry_after(response.headers()));
                    warn!(
                        resource = %item_type,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited by HubSpot, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    warn!(
                        resource = %item_type,
                        status = status.as_u16(),
                        body = %truncate(&body, 200),
                        "HubSpot list request failed"
                    );
                    return Err(IntegrationError::Upstream {
                        status: status.as_u16(),
                        resource: item_type,
                    });
                }
            }
        };

        let envelope: ListResponse = response.json().await.map_err(|e| {
            IntegrationError::Internal(format!(
                "Unreadable {} page from HubSpot: {}",
                item_type, e
            ))
        })?;

        let next_cursor = envelope.next_cursor();
        let items: Vec<IntegrationItem> = envelope
            .results
            .iter()
            .map(|record| normalize(record, item_type, &self.app_base_url))
            .collect();

        debug!(
            resource = %item_type,
            count = items.len(),
            has_more = next_cursor.is_some(),
            "Fetched HubSpot page"
        );

        Ok(PageResult {
            items,
            has_more: next_cursor.is_some(),
            next_cursor,
        })
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
