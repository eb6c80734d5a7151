//! Combined continuation token for the three object feeds.

use crate::items::{IntegrationItem, ItemType};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

/// Resume point of one feed.
///
/// `buffered` holds records already fetched from HubSpot but not yet handed
/// out; `after` is the provider cursor for the next upstream page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffered: Vec<IntegrationItem>,
}

impl FeedCursor {
    /// Nothing buffered and nothing left upstream.
    pub fn is_finished(&self) -> bool {
        self.after.is_none() && self.buffered.is_empty()
    }
}

/// Per-feed resume points. A `None` slot means that feed is done.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombinedCursor {
    #[serde(default)]
    pub contacts: Option<FeedCursor>,
    #[serde(default)]
    pub companies: Option<FeedCursor>,
    #[serde(default)]
    pub deals: Option<FeedCursor>,
}

impl CombinedCursor {
    pub fn slot(&self, item_type: ItemType) -> Option<&FeedCursor> {
        match item_type {
            ItemType::Contact => self.contacts.as_ref(),
            ItemType::Company => self.companies.as_ref(),
            ItemType::Deal => self.deals.as_ref(),
        }
    }

    pub fn take_slot(&mut self, item_type: ItemType) -> Option<FeedCursor> {
        match item_type {
            ItemType::Contact => self.contacts.take(),
            ItemType::Company => self.companies.take(),
            ItemType::Deal => self.deals.take(),
        }
    }

    /// Store a feed's resume point; finished feeds are stored as `None`.
    pub fn set_slot(&mut self, item_type: ItemType, feed: FeedCursor) {
        let value = (!feed.is_finished()).then_some(feed);
        match item_type {
            ItemType::Contact => self.contacts = value,
            ItemType::Company => self.companies = value,
            ItemType::Deal => self.deals = value,
        }
    }

    /// Every feed is done.
    pub fn is_finished(&self) -> bool {
        self.contacts.is_none() && self.companies.is_none() && self.deals.is_none()
    }

    /// Opaque token handed to the caller.
    pub fn encode(&self) -> String {
        // Plain data with string keys always serializes
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Parse a token; `None` when it is not one of ours.
    ///
    /// A finished cursor is never handed out, so one that decodes to no live
    /// feed is rejected as well.
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim().trim_end_matches('='))
            .ok()?;
        let mut cursor: CombinedCursor = serde_json::from_slice(&bytes).ok()?;
        for item_type in ItemType::ALL {
            if let Some(feed) = cursor.take_slot(item_type) {
                cursor.set_slot(item_type, feed);
            }
        }
        (!cursor.is_finished()).then_some(cursor)
    }
}
