use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL of the headless rendering service.
    pub browser_endpoint: String,
    pub intent_api_url: String,
    pub intent_api_key: Option<String>,
    /// Overrides the default browser identity when set.
    pub user_agent: Option<String>,
    /// Upper bound on pages a single start command may request.
    pub max_pages_cap: Option<u32>,
    /// Start commands allowed per connection per minute.
    pub session_starts_per_minute: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            browser_endpoint: env::var("BROWSER_ENDPOINT")
                .context("BROWSER_ENDPOINT must be set")?,
            intent_api_url: env::var("INTENT_API_URL").context("INTENT_API_URL must be set")?,
            intent_api_key: env::var("INTENT_API_KEY").ok(),
            user_agent: env::var("SCRAPER_USER_AGENT").ok(),
            max_pages_cap: env::var("MAX_PAGES_CAP")
                .ok()
                .map(|v| v.parse().context("MAX_PAGES_CAP must be a valid number"))
                .transpose()?,
            session_starts_per_minute: env::var("SESSION_STARTS_PER_MINUTE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("SESSION_STARTS_PER_MINUTE must be a valid number")?,
        })
    }
}
