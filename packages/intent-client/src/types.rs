//! Request and response types for the intent API.

use serde::{Deserialize, Serialize};

/// Request body for the detect endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    /// Free text to classify (already normalized by the caller).
    pub text: String,
}

/// A single classification result.
#[derive(Debug, Clone, Deserialize)]
pub struct IntentPrediction {
    /// Classifier label, e.g. "subsidy" or "none".
    pub label: String,

    /// Confidence in [0.0, 1.0].
    pub score: f32,
}

impl IntentPrediction {
    /// Whether the classifier judged the text relevant to the subsidy domain.
    pub fn is_positive(&self) -> bool {
        self.label.eq_ignore_ascii_case("subsidy")
    }
}
