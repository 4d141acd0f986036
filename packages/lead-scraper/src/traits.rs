//! Collaborator seams for the scrape pipeline.
//!
//! These are infrastructure traits only, no business logic. Each one
//! isolates an external collaborator so the orchestration loop is
//! testable with canned implementations.

use async_trait::async_trait;

use crate::error::{FetchResult, StorageResult};
use crate::types::{NewLead, QualifiedLead, RenderedPage};

/// Boxed error for collaborator calls whose failures are absorbed by
/// policy (fail-closed classification) rather than propagated.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// BROWSER DRIVER: headless rendering (network side effects)
// ============================================================================

/// Drives a headless-browser/rendering session. One instance is
/// acquired per scrape session and owned by it until teardown.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Fetch a URL and return the fully rendered document.
    async fn fetch_rendered_page(&self, url: &str) -> FetchResult<RenderedPage>;
}

// Sessions take the driver by value; a shared driver is passed as an Arc.
#[async_trait]
impl<T: BrowserDriver + ?Sized> BrowserDriver for std::sync::Arc<T> {
    async fn fetch_rendered_page(&self, url: &str) -> FetchResult<RenderedPage> {
        (**self).fetch_rendered_page(url).await
    }
}

// ============================================================================
// ROBOTS SOURCE: crawl-rules retrieval
// ============================================================================

/// Retrieves the crawl-rules document for a host. Split from
/// `BrowserDriver` because robots.txt is plain text and must not go
/// through page rendering.
#[async_trait]
pub trait RobotsFetcher: Send + Sync {
    /// Fetch the robots.txt body for the given origin, e.g.
    /// `https://example.com`. Any failure is treated by the policy
    /// checker as "do not crawl".
    async fn fetch_robots(&self, origin: &str) -> FetchResult<String>;
}

// ============================================================================
// INTENT CLASSIFIER: external text classification
// ============================================================================

/// Raw classifier verdict as the collaborator reports it.
#[derive(Debug, Clone)]
pub struct IntentVerdict {
    pub label: String,
    pub score: f32,
}

impl IntentVerdict {
    /// Whether the label is the positive (subsidy-intent) class.
    pub fn is_positive(&self) -> bool {
        self.label.eq_ignore_ascii_case("subsidy")
    }
}

/// External text-classification collaborator.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<IntentVerdict, BoxError>;
}

// ============================================================================
// LEAD STORE: persistence
// ============================================================================

/// Document store surface used by the dedup gate. The CRUD layer's
/// richer surface (list, update status, delete) is external to this
/// core and not part of this trait.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Look up an existing lead by dedup identity key.
    async fn find_duplicate(&self, identity_key: &str) -> StorageResult<Option<QualifiedLead>>;

    /// Conditional insert: returns `false` without mutation when a
    /// lead with the same identity key already exists.
    async fn insert_if_absent(&self, lead: NewLead) -> StorageResult<bool>;
}

// Sessions take the store by value; a shared store is passed as an Arc.
#[async_trait]
impl<T: LeadStore + ?Sized> LeadStore for std::sync::Arc<T> {
    async fn find_duplicate(&self, identity_key: &str) -> StorageResult<Option<QualifiedLead>> {
        (**self).find_duplicate(identity_key).await
    }

    async fn insert_if_absent(&self, lead: NewLead) -> StorageResult<bool> {
        (**self).insert_if_absent(lead).await
    }
}
