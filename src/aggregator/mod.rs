//! Merged listing across the contact, company and deal feeds.
//!
//! Each call advances the three feeds concurrently, merges what they hold,
//! sorts newest first and hands out one page. Records that were fetched but
//! did not fit stay in the outgoing cursor, so nothing is skipped when a
//! feed's HubSpot cursor has already moved past them.

mod cursor;

pub use cursor::{CombinedCursor, FeedCursor};

use crate::config::FetchConfig;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::hubspot::{HubSpotClient, PageResult};
use crate::items::{IntegrationItem, ItemType};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Anything that can serve one page of a feed.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        access_token: &str,
        item_type: ItemType,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<PageResult>;
}

#[async_trait]
impl PageSource for HubSpotClient {
    async fn fetch_page(
        &self,
        access_token: &str,
        item_type: ItemType,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<PageResult> {
        HubSpotClient::fetch_page(self, access_token, item_type, cursor, page_size).await
    }
}

/// One merged page handed to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemsPage {
    pub items: Vec<IntegrationItem>,
    pub next_cursor_token: Option<String>,
    pub has_more: bool,
}

pub struct Aggregator<S = HubSpotClient> {
    source: S,
    fetch: FetchConfig,
}

impl<S: PageSource> Aggregator<S> {
    pub fn new(source: S, fetch: FetchConfig) -> Self {
        Self { source, fetch }
    }

    /// List the next page of merged items.
    ///
    /// A missing or unreadable `cursor_token` starts every feed from the
    /// beginning. `page_size` falls back to the configured default and is
    /// clamped to the configured maximum.
    pub async fn list_items(
        &self,
        credentials: &Credentials,
        cursor_token: Option<&str>,
        page_size: Option<usize>,
    ) -> Result<ItemsPage> {
        let access_token = credentials.bearer_token()?;
        let page_size = self.fetch.page_size(page_size);

        let incoming = match cursor_token.filter(|t| !t.trim().is_empty()) {
            None => None,
            Some(token) => {
                let decoded = CombinedCursor::decode(token);
                if decoded.is_none() {
                    warn!("Ignoring unreadable cursor token, starting from the beginning");
                }
                decoded
            }
        };
        let fresh = incoming.is_none();
        let mut incoming = incoming.unwrap_or_default();

        let (contacts, companies, deals) = futures::future::try_join3(
            self.advance(access_token, ItemType::Contact, incoming.take_slot(ItemType::Contact), fresh, page_size),
            self.advance(access_token, ItemType::Company, incoming.take_slot(ItemType::Company), fresh, page_size),
            self.advance(access_token, ItemType::Deal, incoming.take_slot(ItemType::Deal), fresh, page_size),
        )
        .await?;

        let mut outgoing = CombinedCursor::default();
        let mut pool = Vec::new();
        for (item_type, mut feed) in [
            (ItemType::Contact, contacts),
            (ItemType::Company, companies),
            (ItemType::Deal, deals),
        ] {
            pool.append(&mut feed.buffered);
            outgoing.set_slot(item_type, feed);
        }

        // Newest first; None < Some, so undated items end up last
        pool.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));

        let surplus = if pool.len() > page_size {
            pool.split_off(page_size)
        } else {
            Vec::new()
        };
        let surplus_count = surplus.len();
        for item in surplus {
            let item_type = item.item_type;
            let mut feed = outgoing.take_slot(item_type).unwrap_or_default();
            feed.buffered.push(item);
            outgoing.set_slot(item_type, feed);
        }

        let next_cursor_token = (!outgoing.is_finished()).then(|| outgoing.encode());

        info!(
            returned = pool.len(),
            buffered = surplus_count,
            has_more = next_cursor_token.is_some(),
            "Listed HubSpot items"
        );

        Ok(ItemsPage {
            items: pool,
            has_more: next_cursor_token.is_some(),
            next_cursor_token,
        })
    }

    /// Bring one feed up to at least `page_size` held records when upstream
    /// still has some.
    async fn advance(
        &self,
        access_token: &str,
        item_type: ItemType,
        slot: Option<FeedCursor>,
        fresh: bool,
        page_size: usize,
    ) -> Result<FeedCursor> {
        let feed = match (fresh, slot) {
            (true, _) => None,
            (false, None) => return Ok(FeedCursor::default()),
            (false, Some(feed)) => Some(feed),
        };

        let (after, mut buffered) = match feed {
            // First call: fetch from the start
            None => (None, Vec::new()),
            Some(FeedCursor { after: None, buffered }) => {
                return Ok(FeedCursor { after: None, buffered });
            }
            Some(FeedCursor { after, buffered }) => (after, buffered),
        };

        if buffered.len() >= page_size {
            debug!(resource = %item_type, buffered = buffered.len(), "Serving feed from buffer");
            return Ok(FeedCursor { after, buffered });
        }

        let page = self
            .source
            .fetch_page(access_token, item_type, after.as_deref(), page_size - buffered.len())
            .await?;
        buffered.extend(page.items);

        Ok(FeedCursor {
            after: page.next_cursor,
            buffered,
        })
    }
}
