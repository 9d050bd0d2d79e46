//! HTTP surface for the aggregation pipeline
//!
//! `GET|POST /` and `GET|POST /poverty` take an optional `country` query
//! parameter and always answer 200 with the aggregate document unless the
//! provider secret is unavailable.

use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::pipeline::Pipeline;

/// Shared state for request handlers
#[derive(Clone)]
pub struct WebState {
    pipeline: Arc<Pipeline>,
    default_country: Arc<str>,
}

impl WebState {
    pub fn new(pipeline: Pipeline, default_country: &str) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            default_country: Arc::from(default_country),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CountryQuery {
    country: Option<String>,
}

/// Builds the router with permissive CORS for browser clients
pub fn router(state: WebState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(country_report).post(country_report))
        .route("/poverty", get(country_report).post(country_report))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C
pub async fn serve(state: WebState, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}

async fn country_report(
    State(state): State<WebState>,
    Query(query): Query<CountryQuery>,
) -> Response {
    let code = query
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&state.default_country)
        .to_string();

    match state.pipeline.run(&code).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            error!(country = %code, error = %e, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
