//! Scrape orchestration core: policy checking, paced fetching, record
//! extraction, intent qualification, dedup, and the session state
//! machine that drives them.
//!
//! Transport (WebSocket server, connection registry) lives in the
//! server package; this crate is transport-agnostic and talks to the
//! outside world only through the traits in [`traits`] and the
//! [`events::EventSink`] it emits into.

pub mod browser;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod extractor;
pub mod fetcher;
pub mod gate;
pub mod policy;
pub mod retry;
pub mod session;
pub mod storage;
pub mod traits;
pub mod types;

pub use config::ScraperConfig;
pub use error::{FetchError, Result, ScrapeError, StorageError};
pub use events::{EventSink, SessionEvent};
pub use session::{validate_request, SessionOutcome, SessionRunner};
pub use types::{QualifiedLead, RawRecord, ScrapeRequest, SessionState, SessionStats};
