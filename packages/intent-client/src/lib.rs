//! Pure REST client for the subsidy-intent classification API.
//!
//! A minimal client with no domain-specific logic: it sends text,
//! the service answers with a label and a confidence score. How the
//! answer is interpreted (thresholds, fail-closed behavior) belongs
//! to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use intent_client::IntentClient;
//!
//! let client = IntentClient::from_env()?;
//! let prediction = client.detect("plombier chauffagiste paris 11e").await?;
//! if prediction.is_positive() {
//!     // record qualifies
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{IntentError, Result};
pub use types::{DetectRequest, IntentPrediction};

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout for classification calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Intent classification API client.
#[derive(Clone)]
pub struct IntentClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl IntentClient {
    /// Create a new client for the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| IntentError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key: None,
        })
    }

    /// Create from the `INTENT_API_URL` environment variable.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("INTENT_API_URL")
            .map_err(|_| IntentError::Config("INTENT_API_URL not set".into()))?;
        let mut client = Self::new(base_url)?;
        client.api_key = std::env::var("INTENT_API_KEY").ok();
        Ok(client)
    }

    /// Attach a bearer token to every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Get the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Classify a piece of text for subsidy intent.
    pub async fn detect(&self, text: &str) -> Result<IntentPrediction> {
        let start = std::time::Instant::now();

        let mut request = self
            .http_client
            .post(format!("{}/detect-subsidy-intent", self.base_url))
            .json(&DetectRequest {
                text: text.to_string(),
            });

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "intent API request failed");
            IntentError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "intent API error");
            return Err(IntentError::Api(format!(
                "intent API returned {}: {}",
                status, error_text
            )));
        }

        let prediction: IntentPrediction = response
            .json()
            .await
            .map_err(|e| IntentError::Parse(e.to_string()))?;

        debug!(
            label = %prediction.label,
            score = prediction.score,
            duration_ms = start.elapsed().as_millis(),
            "intent classification"
        );

        Ok(prediction)
    }
}
