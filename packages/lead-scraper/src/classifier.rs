//! Intent classifier adapter.
//!
//! Turns a raw record into a relevance decision through the external
//! text classifier. Fails closed: a classifier error or timeout marks
//! the record as not qualifying so one collaborator hiccup never
//! aborts a whole session. Failures are counted by the caller.

use std::time::Duration;

use crate::traits::IntentClassifier;
use crate::types::{normalize_text, RawRecord};

/// Outcome of one qualification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifyOutcome {
    Qualified,
    NotQualified,
    /// Collaborator failed; treated as not qualifying (fail-closed).
    Errored,
}

pub struct IntentGate<C> {
    classifier: C,
    timeout: Duration,
}

impl<C: IntentClassifier> IntentGate<C> {
    pub fn new(classifier: C, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    /// Classify one record for subsidy intent.
    pub async fn qualify(&self, record: &RawRecord) -> QualifyOutcome {
        let text = classification_text(record);

        let verdict =
            match tokio::time::timeout(self.timeout, self.classifier.classify(&text)).await {
                Ok(Ok(verdict)) => verdict,
                Ok(Err(e)) => {
                    tracing::warn!(name = %record.name, error = %e, "classifier failed, record not qualifying");
                    return QualifyOutcome::Errored;
                }
                Err(_) => {
                    tracing::warn!(name = %record.name, "classifier timed out, record not qualifying");
                    return QualifyOutcome::Errored;
                }
            };

        if verdict.is_positive() {
            QualifyOutcome::Qualified
        } else {
            QualifyOutcome::NotQualified
        }
    }
}

/// Classification input: normalized name and address concatenated.
fn classification_text(record: &RawRecord) -> String {
    format!(
        "{} {}",
        normalize_text(&record.name),
        normalize_text(&record.address)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{BoxError, IntentVerdict};
    use async_trait::async_trait;

    struct CannedClassifier {
        label: Option<&'static str>,
        slow: bool,
    }

    #[async_trait]
    impl IntentClassifier for CannedClassifier {
        async fn classify(&self, _text: &str) -> Result<IntentVerdict, BoxError> {
            if self.slow {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            match self.label {
                Some(label) => Ok(IntentVerdict {
                    label: label.to_string(),
                    score: 0.9,
                }),
                None => Err("classifier unavailable".into()),
            }
        }
    }

    fn record() -> RawRecord {
        RawRecord {
            name: "Chauffage  Dupont".to_string(),
            phone: "0123456789".to_string(),
            address: "12 Rue de la Paix".to_string(),
            source_url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn test_classification_text_is_normalized() {
        assert_eq!(
            classification_text(&record()),
            "chauffage dupont 12 rue de la paix"
        );
    }

    #[tokio::test]
    async fn test_positive_label_qualifies() {
        let gate = IntentGate::new(
            CannedClassifier {
                label: Some("subsidy"),
                slow: false,
            },
            Duration::from_secs(1),
        );
        assert_eq!(gate.qualify(&record()).await, QualifyOutcome::Qualified);
    }

    #[tokio::test]
    async fn test_negative_label_does_not_qualify() {
        let gate = IntentGate::new(
            CannedClassifier {
                label: Some("none"),
                slow: false,
            },
            Duration::from_secs(1),
        );
        assert_eq!(gate.qualify(&record()).await, QualifyOutcome::NotQualified);
    }

    #[tokio::test]
    async fn test_classifier_error_fails_closed() {
        let gate = IntentGate::new(
            CannedClassifier {
                label: None,
                slow: false,
            },
            Duration::from_secs(1),
        );
        assert_eq!(gate.qualify(&record()).await, QualifyOutcome::Errored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_timeout_fails_closed() {
        let gate = IntentGate::new(
            CannedClassifier {
                label: Some("subsidy"),
                slow: true,
            },
            Duration::from_secs(1),
        );
        assert_eq!(gate.qualify(&record()).await, QualifyOutcome::Errored);
    }
}
