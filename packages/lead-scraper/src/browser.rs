//! HTTP implementations of the network seams: a client for a
//! browserless-style rendering service, and a plain robots.txt
//! fetcher.
//!
//! The rendering service runs the headless browser; this client only
//! speaks its REST API, so one `RemoteBrowser` per session gives the
//! session exclusive ownership of its network identity.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::traits::{BrowserDriver, RobotsFetcher};
use crate::types::RenderedPage;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    url: &'a str,
    user_agent: &'a str,
    wait_until: &'a str,
}

/// Client for a headless-browser rendering endpoint
/// (`POST {endpoint}/content` returns the rendered document body).
pub struct RemoteBrowser {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
}

impl RemoteBrowser {
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
        })
    }
}

#[async_trait]
impl BrowserDriver for RemoteBrowser {
    async fn fetch_rendered_page(&self, url: &str) -> FetchResult<RenderedPage> {
        let response = self
            .client
            .post(format!("{}/content", self.endpoint))
            .json(&RenderRequest {
                url,
                user_agent: &self.user_agent,
                wait_until: "networkidle2",
            })
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            return Err(FetchError::BlockedByTarget {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Network {
                url: url.to_string(),
                reason: format!("rendering service returned {}", status),
            });
        }

        let html = response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: format!("failed to read rendered body: {}", e),
        })?;

        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}

/// Plain-text robots.txt retrieval over the same identity the scraper
/// presents to the target.
pub struct HttpRobotsFetcher {
    client: reqwest::Client,
}

impl HttpRobotsFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RobotsFetcher for HttpRobotsFetcher {
    async fn fetch_robots(&self, origin: &str) -> FetchResult<String> {
        let url = format!("{}/robots.txt", origin.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network {
                url,
                reason: format!("robots.txt request returned {}", status),
            });
        }

        response.text().await.map_err(|e| FetchError::Network {
            url: format!("{}/robots.txt", origin),
            reason: e.to_string(),
        })
    }
}

fn classify_reqwest_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
