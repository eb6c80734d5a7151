//! HubSpot CRM API access: paginated object listing with rate-limit backoff.

mod api;
mod backoff;

pub use api::{HubSpotClient, PageResult};
pub use backoff::{retry_after, RetryPolicy};
