// Lead Scraper API - Server Core
//
// WebSocket transport and wiring around the lead-scraper pipeline:
// per-connection session registry, intent API adapter, and the Axum
// application.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
