//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Router,
};
use intent_client::IntentClient;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use lead_scraper::storage::PostgresLeadStore;
use lead_scraper::ScraperConfig;

use crate::config::Config;
use crate::kernel::{IntentAdapter, SessionRegistry};
use crate::server::routes::{health_handler, ws_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PostgresLeadStore>,
    pub registry: Arc<SessionRegistry>,
    pub intent: IntentAdapter,
    pub scraper: ScraperConfig,
    pub browser_endpoint: String,
}

/// Build the Axum application router
pub fn build_app(pool: PgPool, config: &Config) -> anyhow::Result<Router> {
    let mut intent_client = IntentClient::new(config.intent_api_url.as_str())?;
    if let Some(key) = &config.intent_api_key {
        intent_client = intent_client.with_api_key(key.as_str());
    }

    let mut scraper = ScraperConfig::default();
    if let Some(user_agent) = &config.user_agent {
        scraper = scraper.with_user_agent(user_agent.as_str());
    }
    if let Some(cap) = config.max_pages_cap {
        scraper = scraper.with_max_pages_cap(cap);
    }

    let state = AppState {
        store: Arc::new(PostgresLeadStore::new(pool)),
        registry: Arc::new(SessionRegistry::new(config.session_starts_per_minute)),
        intent: IntentAdapter::new(intent_client),
        scraper,
        browser_endpoint: config.browser_endpoint.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(HeaderValue::from_static(
            "http://localhost:3000",
        )))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}
