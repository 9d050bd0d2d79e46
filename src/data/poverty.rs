//! World Bank Poverty and Inequality Platform (PIP) client
//!
//! Fetches every available year of poverty data for a country at a fixed
//! poverty line. The provider is allowed to be down: every failure yields an
//! empty sequence instead of an error.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::PovertyRecord;

/// Base URL for the PIP API
pub const PIP_BASE_URL: &str = "https://api.worldbank.org/pip/v1/pip";

/// International poverty line in 2017 PPP dollars per day
pub const DEFAULT_POVERTY_LINE: f64 = 2.15;

/// Provider of per-country poverty data
#[async_trait]
pub trait PovertySource: Send + Sync {
    /// Fetches all available years for `code`; never fails outward
    async fn fetch_poverty_data(&self, code: &str) -> PovertyRecord;
}

/// Client for the PIP API
#[derive(Debug, Clone)]
pub struct PovertyClient {
    http_client: Client,
    base_url: String,
    poverty_line: f64,
}

impl PovertyClient {
    /// Creates a client whose requests time out after `timeout`
    pub fn new(
        base_url: impl Into<String>,
        poverty_line: f64,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, base_url, poverty_line))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(
        http_client: Client,
        base_url: impl Into<String>,
        poverty_line: f64,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            poverty_line,
        }
    }

    async fn request(&self, code: &str) -> Result<(StatusCode, String), reqwest::Error> {
        let povline = self.poverty_line.to_string();
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("country", code),
                ("year", "all"),
                ("povline", povline.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl PovertySource for PovertyClient {
    async fn fetch_poverty_data(&self, code: &str) -> PovertyRecord {
        match self.request(code).await {
            Ok((status, body)) => match parse_response(status, &body) {
                Some(record) => {
                    debug!(country = code, years = record.year_count(), "Fetched poverty data");
                    record
                }
                None => {
                    warn!(country = code, status = status.as_u16(), "No poverty data available");
                    PovertyRecord::empty()
                }
            },
            Err(e) => {
                warn!(country = code, error = %e, "Poverty data request failed");
                PovertyRecord::empty()
            }
        }
    }
}

/// Accepts a response only if the status is 2xx and the body is non-empty,
/// valid JSON
fn parse_response(status: StatusCode, body: &str) -> Option<PovertyRecord> {
    if !status.is_success() || body.trim().is_empty() {
        return None;
    }
    serde_json::from_str(body).ok().map(PovertyRecord)
}
