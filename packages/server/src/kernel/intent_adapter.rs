//! Adapter between the intent API client and the scrape pipeline's
//! classifier seam.

use async_trait::async_trait;
use intent_client::IntentClient;
use lead_scraper::traits::{BoxError, IntentClassifier, IntentVerdict};

/// Implements the pipeline's classifier trait over the REST client.
/// Errors pass through untouched; the pipeline's fail-closed handling
/// decides what a failure means.
#[derive(Clone)]
pub struct IntentAdapter {
    client: IntentClient,
}

impl IntentAdapter {
    pub fn new(client: IntentClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IntentClassifier for IntentAdapter {
    async fn classify(&self, text: &str) -> Result<IntentVerdict, BoxError> {
        let prediction = self.client.detect(text).await?;
        Ok(IntentVerdict {
            label: prediction.label,
            score: prediction.score,
        })
    }
}
