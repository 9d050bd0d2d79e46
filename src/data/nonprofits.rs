//! Every.org nonprofit browse client
//!
//! Walks the offset-paginated `browse/poverty` listing page by page. Every
//! way the walk can end is a named [`StopReason`]; none of them is an error,
//! so callers always get whatever was collected before the walk stopped.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::OrgListing;

/// Base URL for the Every.org poverty cause listing
pub const EVERY_ORG_BASE_URL: &str = "https://partners.every.org/v0.2/browse/poverty";

/// Items requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched in one walk, whatever the provider declares
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Provider of the full nonprofit listing
#[async_trait]
pub trait OrgSource: Send + Sync {
    /// Fetches every reachable listing; never fails outward
    async fn fetch_all_orgs(&self, api_key: &str) -> Vec<OrgListing>;
}

/// Why a pagination walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back with a non-success status
    UpstreamStatus(u16),
    /// A page request failed or timed out before a response arrived
    Transport,
    /// A page body was not a valid listing document
    MalformedPage,
    /// A page held no items
    EmptyPage,
    /// The current page reached the provider's declared page count
    ReachedDeclaredTotal,
    /// The page ceiling was reached
    PageCeiling,
}

/// Outcome of a pagination walk
#[derive(Debug, Clone)]
pub struct Harvest {
    /// Listings in page order
    pub listings: Vec<OrgListing>,
    /// Number of page requests issued
    pub requests: u32,
    pub stop: StopReason,
}

/// One page of the browse response
///
/// Items and pagination metadata are kept loosely typed so that a bad item
/// or odd metadata never costs the rest of the page.
#[derive(Debug, Default, Deserialize)]
struct BrowsePage {
    #[serde(default)]
    nonprofits: Option<Vec<Value>>,
    #[serde(default)]
    pagination: Option<Value>,
}

impl BrowsePage {
    /// The declared page count; anything but a non-negative integer counts as absent
    fn declared_pages(&self) -> Option<u32> {
        self.pagination
            .as_ref()?
            .get("pages")?
            .as_u64()
            .and_then(|pages| u32::try_from(pages).ok())
    }

    /// Decodes each item on its own, skipping items that are not objects
    fn into_listings(self, page: u32) -> Vec<OrgListing> {
        self.nonprofits
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawNonprofit>(item) {
                Ok(raw) => Some(OrgListing::from(raw)),
                Err(e) => {
                    warn!(page, error = %e, "Skipping unreadable nonprofit");
                    None
                }
            })
            .collect()
    }
}

/// A nonprofit as the provider sends it; every field may be absent, null or
/// of an unexpected type
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNonprofit {
    #[serde(default, deserialize_with = "lenient_text")]
    name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    website_url: String,
    #[serde(default, deserialize_with = "lenient_text")]
    location: String,
    #[serde(default, deserialize_with = "lenient_tags")]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    profile_url: String,
    #[serde(default, deserialize_with = "lenient_text")]
    logo_url: String,
    #[serde(default, deserialize_with = "lenient_text")]
    cover_image_url: String,
}

impl From<RawNonprofit> for OrgListing {
    fn from(raw: RawNonprofit) -> Self {
        Self {
            name: raw.name,
            description: raw.description,
            website: raw.website_url,
            location: raw.location,
            tags: raw.tags,
            profile_url: raw.profile_url,
            logo_url: raw.logo_url,
            cover_image_url: raw.cover_image_url,
        }
    }
}

/// Null becomes empty, other non-strings their JSON text
fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Value::deserialize(deserializer).map(|value| text_of(&value))
}

/// Accepts a list of strings or of `{"tagName": ...}` objects; nulls are dropped
fn lenient_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let tag = |value: &Value| match value {
        Value::Null => None,
        Value::Object(fields) => fields.get("tagName").map(text_of),
        other => Some(text_of(other)),
    };
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(tag).collect(),
        other => tag(&other).into_iter().collect(),
    })
}

/// Client for the Every.org browse API
#[derive(Debug, Clone)]
pub struct NonprofitClient {
    http_client: Client,
    base_url: String,
    page_size: u32,
    max_pages: u32,
}

impl NonprofitClient {
    /// Creates a client whose page requests time out after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, base_url))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Walks pages from 1 upward until one of the [`StopReason`]s applies
    pub async fn harvest(&self, api_key: &str) -> Harvest {
        let mut listings = Vec::new();
        let mut requests = 0;
        let mut page = 1;

        let stop = loop {
            requests += 1;
            let body = match self.fetch_page(api_key, page).await {
                Ok(body) => body,
                Err(reason) => break reason,
            };

            if body.nonprofits.as_deref().unwrap_or_default().is_empty() {
                break StopReason::EmptyPage;
            }
            let declared = body.declared_pages();
            listings.extend(body.into_listings(page));
            debug!(page, total = listings.len(), "Fetched nonprofit page");

            if let Some(reason) = page_limit(page, declared, self.max_pages) {
                break reason;
            }
            page += 1;
        };

        match stop {
            StopReason::UpstreamStatus(_) | StopReason::Transport | StopReason::MalformedPage => {
                warn!(page, ?stop, kept = listings.len(), "Nonprofit pagination ended early");
            }
            StopReason::PageCeiling => {
                info!(max_pages = self.max_pages, "Reached maximum page limit");
            }
            StopReason::EmptyPage | StopReason::ReachedDeclaredTotal => {}
        }

        Harvest {
            listings,
            requests,
            stop,
        }
    }

    /// Requests a single page, mapping every failure to the reason it ends the walk
    async fn fetch_page(&self, api_key: &str, page: u32) -> Result<BrowsePage, StopReason> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("apiKey", api_key.to_string()),
                ("take", self.page_size.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(page, error = %e, "Nonprofit page request failed");
                StopReason::Transport
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(page, status = status.as_u16(), body = %body, "Every.org API error");
            return Err(StopReason::UpstreamStatus(status.as_u16()));
        }

        let text = response.text().await.map_err(|_| StopReason::Transport)?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(page, error = %e, "Nonprofit page did not parse");
            StopReason::MalformedPage
        })
    }
}

#[async_trait]
impl OrgSource for NonprofitClient {
    async fn fetch_all_orgs(&self, api_key: &str) -> Vec<OrgListing> {
        self.harvest(api_key).await.listings
    }
}

/// Decides whether the walk ends after a successful, non-empty `page`
///
/// A missing declared total counts as "this page is the last one".
fn page_limit(page: u32, declared_pages: Option<u32>, max_pages: u32) -> Option<StopReason> {
    if page >= declared_pages.unwrap_or(page) {
        return Some(StopReason::ReachedDeclaredTotal);
    }
    if page >= max_pages {
        return Some(StopReason::PageCeiling);
    }
    None
}
