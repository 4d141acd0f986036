//! Scraper configuration.

use std::ops::Range;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Tunables for one scrape pipeline. Defaults match the pacing and
/// limits the target directory site tolerates.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Identity string sent with every page request.
    pub user_agent: String,

    /// Search URL template; `{keyword}`, `{city}` and `{page}` are
    /// substituted per request.
    pub search_url_template: String,

    /// Randomized pre-fetch delay, milliseconds. Uniformly sampled
    /// per fetch; skipped for a session's first page.
    pub delay_ms: Range<u64>,

    /// Per-fetch timeout.
    pub fetch_timeout: Duration,

    /// Per-classification timeout.
    pub classify_timeout: Duration,

    /// Upper bound a caller may request for `max_pages`.
    pub max_pages_cap: u32,

    /// Consecutive commit failures tolerated before the session is
    /// treated as a storage outage.
    pub storage_failure_threshold: u32,

    /// Retry policy for page fetches and the robots.txt fetch.
    pub retry: RetryPolicy,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            search_url_template:
                "https://www.pagesjaunes.fr/recherche/{city}/{keyword}?page={page}".to_string(),
            delay_ms: 2000..5000,
            fetch_timeout: Duration::from_secs(30),
            classify_timeout: Duration::from_secs(10),
            max_pages_cap: 20,
            storage_failure_threshold: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl ScraperConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: Range<u64>) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_pages_cap(mut self, cap: u32) -> Self {
        self.max_pages_cap = cap;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the search URL for a given page number.
    pub fn page_url(&self, keyword: &str, city: &str, page: u32) -> String {
        self.search_url_template
            .replace("{keyword}", keyword)
            .replace("{city}", city)
            .replace("{page}", &page.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_substitution() {
        let config = ScraperConfig::default();
        let url = config.page_url("energie", "paris", 3);
        assert_eq!(url, "https://www.pagesjaunes.fr/recherche/paris/energie?page=3");
    }

    #[test]
    fn test_builder_overrides() {
        let config = ScraperConfig::default()
            .with_user_agent("TestAgent/1.0")
            .with_delay_ms(0..1)
            .with_max_pages_cap(5);
        assert_eq!(config.user_agent, "TestAgent/1.0");
        assert_eq!(config.max_pages_cap, 5);
    }
}
