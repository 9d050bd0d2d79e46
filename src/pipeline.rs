//! Per-country aggregation pipeline
//!
//! resolve name → cache lookup → (fresh: return cached) or
//! (miss/stale: fetch poverty data and nonprofits concurrently → match →
//! aggregate → replace cache entry → return).
//!
//! Only a missing or malformed provider secret fails a request. Every other
//! failure degrades to empty or partial data.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::cache::{CacheLookup, CacheStore, DiskCacheStore, FreshnessCache, MemoryCacheStore};
use crate::config::Config;
use crate::data::{
    filter, AggregateResult, CountryCodeTable, CountryResolver, NonprofitClient, OrgSource,
    PovertyClient, PovertySource,
};
use crate::secrets::{EnvSecretStore, SecretError, SecretStore, DEFAULT_SECRET_ID};

/// Errors that abort a request
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The nonprofit provider's credentials could not be loaded
    #[error("Failed to load provider credentials: {0}")]
    Secret(#[from] SecretError),

    /// An upstream HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The aggregation pipeline with all of its collaborators injected
#[derive(Clone)]
pub struct Pipeline {
    resolver: CountryResolver,
    secrets: Arc<dyn SecretStore>,
    secret_id: String,
    poverty: Arc<dyn PovertySource>,
    orgs: Arc<dyn OrgSource>,
    cache: FreshnessCache,
}

impl Pipeline {
    pub fn new(
        resolver: CountryResolver,
        secrets: Arc<dyn SecretStore>,
        poverty: Arc<dyn PovertySource>,
        orgs: Arc<dyn OrgSource>,
        cache: FreshnessCache,
    ) -> Self {
        Self {
            resolver,
            secrets,
            secret_id: DEFAULT_SECRET_ID.to_string(),
            poverty,
            orgs,
            cache,
        }
    }

    pub fn with_secret_id(mut self, secret_id: impl Into<String>) -> Self {
        self.secret_id = secret_id.into();
        self
    }

    /// Wires the production collaborators described by `config`
    ///
    /// Falls back to an in-memory cache when no cache directory can be determined.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let table = CountryCodeTable::load_or_bundled(config.country_codes_path.as_deref());
        let resolver = CountryResolver::new(Arc::new(table));

        let poverty = PovertyClient::new(
            config.poverty_base_url.clone(),
            config.poverty_line,
            timeout,
        )?;
        let orgs = NonprofitClient::new(config.nonprofit_base_url.clone(), timeout)?
            .with_page_size(config.page_size)
            .with_max_pages(config.max_pages);

        let disk_store = config.cache_dir.clone().map(DiskCacheStore::with_dir);
        let store: Arc<dyn CacheStore> = match disk_store {
            Some(store) => Arc::new(store),
            None => match DiskCacheStore::new() {
                Some(store) => Arc::new(store),
                None => {
                    warn!("No cache directory available, caching in memory only");
                    Arc::new(MemoryCacheStore::new())
                }
            },
        };
        let cache = FreshnessCache::with_window_secs(store, config.freshness_secs);

        Ok(Self::new(resolver, Arc::new(EnvSecretStore), Arc::new(poverty), Arc::new(orgs), cache)
            .with_secret_id(config.secret_id.clone()))
    }

    /// Returns the aggregate for `code`, served from cache while fresh
    pub async fn run(&self, code: &str) -> Result<AggregateResult, PipelineError> {
        self.execute(code, false).await
    }

    /// Rebuilds the aggregate for `code` regardless of cache freshness
    pub async fn refresh(&self, code: &str) -> Result<AggregateResult, PipelineError> {
        self.execute(code, true).await
    }

    async fn execute(
        &self,
        code: &str,
        bypass_fresh: bool,
    ) -> Result<AggregateResult, PipelineError> {
        let identity = self.resolver.identify(code).await;

        let previous = match self.cache.lookup(&identity.code, Utc::now()).await {
            CacheLookup::Fresh(entry) if !bypass_fresh => {
                info!(country = %identity.code, "Returning cached data");
                return Ok(entry.payload);
            }
            CacheLookup::Fresh(entry) | CacheLookup::Stale(entry) => Some(entry),
            CacheLookup::Missing => None,
        };

        let secret = self.secrets.get_secret(&self.secret_id).await?;
        info!(country = %identity.code, name = %identity.name, "Processing request");

        let (poverty_data, listings) = futures::join!(
            self.poverty.fetch_poverty_data(&identity.code),
            self.orgs.fetch_all_orgs(&secret.provider_api_key),
        );
        let fetched = listings.len();
        let organizations = filter(listings, &identity.name);
        info!(
            country = %identity.code,
            fetched,
            matched = organizations.len(),
            poverty_years = poverty_data.year_count(),
            "Aggregated country data"
        );

        let result = aggregate(identity, poverty_data, organizations);

        if let Some(previous) = previous {
            if previous.payload.summary.org_count > 0 && result.summary.org_count == 0 {
                warn!(
                    country = %result.identity.code,
                    previous_orgs = previous.payload.summary.org_count,
                    "Replacing cached nonprofits with an empty list"
                );
            }
        }

        self.cache.put(&result.identity.code, &result).await;
        Ok(result)
    }
}
