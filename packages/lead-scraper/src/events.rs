//! Session events and the sink the session manager emits through.
//!
//! The transport adapts `EventSink` to whatever wire protocol it
//! speaks; the session manager only knows these three checkpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::QualifiedLead;

/// Events produced by a running scrape session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Free-text progress.
    Status { message: String },

    /// Final (or, on cancellation, partial) set of committed leads.
    Results { leads: Vec<QualifiedLead> },

    /// Terminal failure with a human-readable reason.
    Error { message: String },
}

/// Event consumer invoked synchronously at session checkpoints.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn on_status(&self, message: String);
    async fn on_results(&self, leads: Vec<QualifiedLead>);
    async fn on_error(&self, message: String);
}

/// Sink that drops everything; for tests and fire-and-forget runs.
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn on_status(&self, _message: String) {}
    async fn on_results(&self, _leads: Vec<QualifiedLead>) {}
    async fn on_error(&self, _message: String) {}
}
