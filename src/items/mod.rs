//! Normalized integration metadata.
//!
//! Every HubSpot record, whatever its object type, is mapped into an
//! [`IntegrationItem`]. The shape is shared with the other integrations of the
//! host application, which is why several fields are always empty here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

mod normalize;

pub use normalize::{normalize, parse_timestamp};

/// HubSpot CRM object kinds that are synced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Contact,
    Company,
    Deal,
}

impl ItemType {
    /// All synced types, in the order their feeds are fetched.
    pub const ALL: [ItemType; 3] = [ItemType::Contact, ItemType::Company, ItemType::Deal];

    /// Path segment of the CRM v3 objects API.
    pub fn resource(&self) -> &'static str {
        match self {
            ItemType::Contact => "contacts",
            ItemType::Company => "companies",
            ItemType::Deal => "deals",
        }
    }

    /// Properties requested for this type.
    pub fn properties(&self) -> &'static [&'static str] {
        match self {
            ItemType::Contact => &[
                "firstname",
                "lastname",
                "email",
                "createdate",
                "lastmodifieddate",
                "hs_lastmodifieddate",
            ],
            ItemType::Company => &["name", "domain", "createdate", "hs_lastmodifieddate"],
            ItemType::Deal => &[
                "dealname",
                "amount",
                "dealstage",
                "createdate",
                "hs_lastmodifieddate",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Contact => "Contact",
            ItemType::Company => "Company",
            ItemType::Deal => "Deal",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common metadata representation of one external record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationItem {
    /// `<hubspot id>_<Type>`, unique across types
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_modified_time: Option<DateTime<Utc>>,
    pub url: Option<String>,

    // Shape-compatibility fields, unused by HubSpot
    pub parent_id: Option<String>,
    pub parent_path_or_name: Option<String>,
    #[serde(default)]
    pub directory: bool,
    pub children: Option<Vec<String>>,
    pub mime_type: Option<String>,
    pub delta: Option<String>,
    pub drive_id: Option<String>,
    pub visibility: Option<bool>,
}

impl IntegrationItem {
    /// Build an item with the shape-compatibility fields at their defaults.
    pub fn new(id: String, name: String, item_type: ItemType) -> Self {
        Self {
            id,
            name,
            item_type,
            creation_time: None,
            last_modified_time: None,
            url: None,
            parent_id: None,
            parent_path_or_name: None,
            directory: false,
            children: None,
            mime_type: None,
            delta: None,
            drive_id: None,
            visibility: Some(true),
        }
    }
}
