//! Shared fixtures: stub upstream providers served by a local axum router

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use povertyatlas::cache::{CacheStore, FreshnessCache};
use povertyatlas::data::{CountryCodeTable, CountryResolver, NonprofitClient, PovertyClient};
use povertyatlas::pipeline::Pipeline;
use povertyatlas::secrets::{ProviderSecret, SecretError, SecretStore};

pub const API_KEY: &str = "pk_test_key";

/// A canned HTTP response
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub body: String,
}

impl Canned {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

struct StubState {
    poverty: Canned,
    pages: Vec<Canned>,
    poverty_hits: AtomicUsize,
    page_hits: AtomicUsize,
    poverty_queries: Mutex<Vec<HashMap<String, String>>>,
    page_queries: Mutex<Vec<HashMap<String, String>>>,
}

/// Stub PIP and Every.org endpoints with request counters
pub struct StubUpstream {
    pub addr: SocketAddr,
    state: Arc<StubState>,
}

impl StubUpstream {
    /// Serves `poverty` at `/pip` and `pages[n - 1]` for `page=n` at `/browse`;
    /// pages past the end are empty
    pub async fn start(poverty: Canned, pages: Vec<Canned>) -> Self {
        let state = Arc::new(StubState {
            poverty,
            pages,
            poverty_hits: AtomicUsize::new(0),
            page_hits: AtomicUsize::new(0),
            poverty_queries: Mutex::new(Vec::new()),
            page_queries: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/pip", get(poverty_handler))
            .route("/browse", get(browse_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub upstream");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub upstream crashed");
        });

        Self { addr, state }
    }

    pub fn poverty_url(&self) -> String {
        format!("http://{}/pip", self.addr)
    }

    pub fn browse_url(&self) -> String {
        format!("http://{}/browse", self.addr)
    }

    pub fn poverty_hits(&self) -> usize {
        self.state.poverty_hits.load(Ordering::SeqCst)
    }

    pub fn page_hits(&self) -> usize {
        self.state.page_hits.load(Ordering::SeqCst)
    }

    /// Query parameters of every `/pip` request, in arrival order
    pub fn poverty_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.poverty_queries.lock().unwrap().clone()
    }

    /// Query parameters of every `/browse` request, in arrival order
    pub fn page_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.page_queries.lock().unwrap().clone()
    }

    /// Values of `param` across all `/browse` requests; absent values are skipped
    pub fn page_param(&self, param: &str) -> Vec<String> {
        self.page_queries()
            .iter()
            .filter_map(|query| query.get(param).cloned())
            .collect()
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.page_param("page")
            .iter()
            .filter_map(|page| page.parse().ok())
            .collect()
    }

    pub fn seen_keys(&self) -> Vec<String> {
        self.page_param("apiKey")
    }

    pub fn nonprofit_client(&self) -> NonprofitClient {
        NonprofitClient::new(self.browse_url(), Duration::from_secs(5)).expect("http client")
    }

    pub fn poverty_client(&self) -> PovertyClient {
        PovertyClient::new(self.poverty_url(), 2.15, Duration::from_secs(5)).expect("http client")
    }

    /// A pipeline wired to this stub, a small country table and `store`
    pub fn pipeline(&self, store: Arc<dyn CacheStore>) -> Pipeline {
        Pipeline::new(
            resolver(),
            Arc::new(StaticSecret::present()),
            Arc::new(self.poverty_client()),
            Arc::new(self.nonprofit_client()),
            FreshnessCache::new(store),
        )
    }
}

fn respond(canned: &Canned) -> (StatusCode, String) {
    (
        StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        canned.body.clone(),
    )
}

async fn poverty_handler(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.poverty_hits.fetch_add(1, Ordering::SeqCst);
    state.poverty_queries.lock().unwrap().push(params);
    respond(&state.poverty)
}

async fn browse_handler(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.page_hits.fetch_add(1, Ordering::SeqCst);
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    state.page_queries.lock().unwrap().push(params);

    match page.checked_sub(1).and_then(|i| state.pages.get(i as usize)) {
        Some(canned) => respond(canned),
        None => (StatusCode::OK, json!({"nonprofits": []}).to_string()),
    }
}

/// A browse page body; each org is `(name, location, description)`
pub fn page(orgs: &[(&str, &str, &str)], declared_pages: u32) -> Canned {
    let nonprofits: Vec<Value> = orgs
        .iter()
        .map(|(name, location, description)| {
            let slug = name.to_lowercase().replace(' ', "-");
            json!({
                "name": name,
                "location": location,
                "description": description,
                "websiteUrl": format!("https://{slug}.example.org"),
                "tags": ["poverty"],
                "profileUrl": format!("https://www.every.org/{slug}"),
                "logoUrl": null,
                "ein": "00-0000000",
            })
        })
        .collect();
    Canned::ok(json!({
        "nonprofits": nonprofits,
        "pagination": {"page": 1, "pages": declared_pages, "pageSize": 100},
    }))
}

/// PIP-style yearly records
pub fn poverty_years(years: &[u32]) -> Canned {
    let records: Vec<Value> = years
        .iter()
        .map(|year| {
            json!({
                "country_code": "AUS",
                "reporting_year": year,
                "headcount": 0.0051,
                "poverty_line": 2.15,
            })
        })
        .collect();
    Canned::ok(Value::Array(records))
}

pub fn resolver() -> CountryResolver {
    let table = CountryCodeTable::from_json(
        r#"[
            {"country_code": "AUS", "country_name": "Australia"},
            {"country_code": "AU", "country_name": "Australia"},
            {"country_code": "BGD", "country_name": "Bangladesh"}
        ]"#,
    )
    .expect("country table");
    CountryResolver::new(Arc::new(table))
}

/// Secret store with a fixed answer
pub struct StaticSecret(Option<String>);

impl StaticSecret {
    pub fn present() -> Self {
        Self(Some(API_KEY.to_string()))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl SecretStore for StaticSecret {
    async fn get_secret(&self, id: &str) -> Result<ProviderSecret, SecretError> {
        self.0
            .clone()
            .map(|provider_api_key| ProviderSecret { provider_api_key })
            .ok_or_else(|| SecretError::Missing(id.to_string()))
    }
}
