//! Scrape session manager: the per-session state machine, pagination
//! loop, cancellation checkpoints, and result aggregation.
//!
//! One logical worker per session. Everything inside a session is
//! strictly sequential: fetch, extract, classify, persist for page n
//! completes before page n+1 starts. Cancellation is cooperative and
//! observed only at checkpoints, never mid-network-call.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::classifier::{IntentGate, QualifyOutcome};
use crate::config::ScraperConfig;
use crate::error::{ScrapeError, StorageError};
use crate::events::EventSink;
use crate::extractor::extract_records;
use crate::fetcher::PageFetcher;
use crate::gate::{CommitOutcome, DedupGate};
use crate::policy::PolicyChecker;
use crate::traits::{BrowserDriver, IntentClassifier, LeadStore, RobotsFetcher};
use crate::types::{QualifiedLead, ScrapeRequest, SessionState, SessionStats};

/// Validate raw start parameters. Rejection happens before a session
/// exists; the caller gets the reason and nothing else changes.
pub fn validate_request(
    keyword: &str,
    city: &str,
    max_pages: Option<u32>,
    cap: u32,
) -> Result<ScrapeRequest, ScrapeError> {
    let keyword = keyword.trim();
    let city = city.trim();

    if keyword.is_empty() {
        return Err(ScrapeError::Validation {
            reason: "keyword must not be empty".to_string(),
        });
    }
    if city.is_empty() {
        return Err(ScrapeError::Validation {
            reason: "city must not be empty".to_string(),
        });
    }

    let max_pages = max_pages.unwrap_or(1);
    if max_pages < 1 || max_pages > cap {
        return Err(ScrapeError::Validation {
            reason: format!("maxPages must be between 1 and {}", cap),
        });
    }

    Ok(ScrapeRequest {
        keyword: keyword.to_string(),
        city: city.to_string(),
        max_pages,
    })
}

/// Terminal summary of one session run.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub state: SessionState,
    pub stats: SessionStats,
    pub leads: Vec<QualifiedLead>,
    pub failure: Option<String>,
}

/// One bounded execution of the scrape loop for a single start
/// command. Owns its browser driver for its whole lifetime; the
/// driver is released when the runner is dropped, on every exit path.
pub struct SessionRunner<B, R, C, S, E> {
    session_id: Uuid,
    caller_id: String,
    request: ScrapeRequest,
    config: ScraperConfig,
    fetcher: PageFetcher<B>,
    policy: PolicyChecker<R>,
    intent: IntentGate<C>,
    gate: DedupGate<S>,
    sink: E,
    cancel: CancellationToken,
    state: SessionState,
    stats: SessionStats,
    committed: Vec<QualifiedLead>,
    started_at: DateTime<Utc>,
}

impl<B, R, C, S, E> SessionRunner<B, R, C, S, E>
where
    B: BrowserDriver,
    R: RobotsFetcher,
    C: IntentClassifier,
    S: LeadStore,
    E: EventSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        caller_id: impl Into<String>,
        request: ScrapeRequest,
        config: ScraperConfig,
        driver: B,
        robots: R,
        classifier: C,
        store: S,
        sink: E,
        cancel: CancellationToken,
    ) -> Self {
        let retry = config.retry.clone();
        Self {
            session_id: Uuid::new_v4(),
            caller_id: caller_id.into(),
            fetcher: PageFetcher::new(
                driver,
                config.delay_ms.clone(),
                config.fetch_timeout,
                retry.clone(),
            ),
            policy: PolicyChecker::new(robots, config.user_agent.clone(), retry),
            intent: IntentGate::new(classifier, config.classify_timeout),
            gate: DedupGate::new(store),
            sink,
            cancel,
            request,
            config,
            state: SessionState::Idle,
            stats: SessionStats::default(),
            committed: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Drive the session to a terminal state. Consumes the runner;
    /// terminal sessions are never reused.
    pub async fn run(mut self) -> SessionOutcome {
        tracing::info!(
            session_id = %self.session_id,
            caller_id = %self.caller_id,
            keyword = %self.request.keyword,
            city = %self.request.city,
            max_pages = self.request.max_pages,
            started_at = %self.started_at,
            "scrape session starting"
        );

        self.state = SessionState::PolicyCheck;
        self.sink
            .on_status(format!(
                "Checking crawl policy for \"{}\" in {}",
                self.request.keyword, self.request.city
            ))
            .await;

        let first_page = self
            .config
            .page_url(&self.request.keyword, &self.request.city, 1);
        let target: Url = match first_page.parse() {
            Ok(url) => url,
            Err(e) => {
                return self
                    .fail(format!("invalid target URL {}: {}", first_page, e))
                    .await;
            }
        };

        if !self.policy.check(&target).await {
            let host = target.host_str().unwrap_or("target").to_string();
            tracing::warn!(session_id = %self.session_id, host = %host, "blocked by crawl policy");
            return self
                .fail(ScrapeError::PolicyBlocked { host }.to_string())
                .await;
        }

        match self.page_loop().await {
            Ok(LoopExit::Finished) => self.complete().await,
            Ok(LoopExit::Cancelled) => self.cancelled().await,
            Err(reason) => self.fail(reason).await,
        }
    }

    async fn page_loop(&mut self) -> Result<LoopExit, String> {
        let mut consecutive_storage_failures: u32 = 0;

        for page in 1..=self.request.max_pages {
            // Cancellation checkpoint: top of each page iteration.
            if self.cancel.is_cancelled() {
                return Ok(LoopExit::Cancelled);
            }

            self.state = SessionState::Fetching;
            let url = self
                .config
                .page_url(&self.request.keyword, &self.request.city, page);

            let rendered = match self.fetcher.fetch(&url).await {
                Ok(rendered) => rendered,
                Err(e) if page == 1 => {
                    // Without page 1 the whole session is pointless.
                    return Err(ScrapeError::FirstPageFetch(e).to_string());
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        page = page,
                        error = %e,
                        "page fetch failed, skipping page"
                    );
                    self.stats.pages_skipped += 1;
                    continue;
                }
            };

            self.state = SessionState::Extracting;
            let records = extract_records(&rendered.html, &rendered.url);
            self.stats.pages_visited += 1;
            self.stats.records_seen += records.len() as u32;

            tracing::debug!(
                session_id = %self.session_id,
                page = page,
                records = records.len(),
                "page extracted"
            );

            for record in &records {
                // Cancellation checkpoint: before each classify/commit.
                if self.cancel.is_cancelled() {
                    return Ok(LoopExit::Cancelled);
                }

                self.state = SessionState::Classifying;
                match self.intent.qualify(record).await {
                    QualifyOutcome::Qualified => self.stats.records_qualified += 1,
                    QualifyOutcome::NotQualified => continue,
                    QualifyOutcome::Errored => {
                        self.stats.classifier_failures += 1;
                        continue;
                    }
                }

                self.state = SessionState::Persisting;
                match self.gate.commit(record, &self.request.keyword).await {
                    Ok(CommitOutcome::Inserted(lead)) => {
                        consecutive_storage_failures = 0;
                        self.committed.push(lead);
                    }
                    Ok(CommitOutcome::Duplicate) => {
                        consecutive_storage_failures = 0;
                        self.stats.duplicates_skipped += 1;
                    }
                    Err(e) => {
                        self.stats.commit_failures += 1;
                        consecutive_storage_failures += 1;
                        tracing::warn!(
                            session_id = %self.session_id,
                            error = %e,
                            "lead commit failed, record dropped"
                        );
                        if consecutive_storage_failures >= self.config.storage_failure_threshold {
                            return Err(ScrapeError::Storage(StorageError::from_source(e))
                                .to_string());
                        }
                    }
                }
            }

            self.sink
                .on_status(format!(
                    "Page {}/{}: {} leads committed so far",
                    page,
                    self.request.max_pages,
                    self.committed.len()
                ))
                .await;
        }

        Ok(LoopExit::Finished)
    }

    async fn complete(mut self) -> SessionOutcome {
        self.state = SessionState::Completed;
        self.sink
            .on_status(format!(
                "Scrape completed: {} leads from {} pages",
                self.committed.len(),
                self.stats.pages_visited
            ))
            .await;
        self.sink.on_results(self.committed.clone()).await;
        self.finish(None)
    }

    async fn cancelled(mut self) -> SessionOutcome {
        self.state = SessionState::Cancelled;
        self.sink
            .on_status(format!(
                "Scrape cancelled: {} leads committed before stop",
                self.committed.len()
            ))
            .await;
        // Whatever was already committed still goes to the caller.
        self.sink.on_results(self.committed.clone()).await;
        self.finish(None)
    }

    async fn fail(mut self, reason: String) -> SessionOutcome {
        self.state = SessionState::Failed;
        self.sink.on_error(reason.clone()).await;
        self.finish(Some(reason))
    }

    fn finish(self, failure: Option<String>) -> SessionOutcome {
        self.stats_log(&failure);
        SessionOutcome {
            session_id: self.session_id,
            state: self.state,
            stats: self.stats,
            leads: self.committed,
            failure,
        }
    }

    fn stats_log(&self, failure: &Option<String>) {
        tracing::info!(
            session_id = %self.session_id,
            caller_id = %self.caller_id,
            state = ?self.state,
            pages_visited = self.stats.pages_visited,
            pages_skipped = self.stats.pages_skipped,
            records_seen = self.stats.records_seen,
            records_qualified = self.stats.records_qualified,
            duplicates_skipped = self.stats.duplicates_skipped,
            classifier_failures = self.stats.classifier_failures,
            commit_failures = self.stats.commit_failures,
            leads_found = self.committed.len(),
            failure = failure.as_deref().unwrap_or(""),
            "scrape session finished"
        );
    }
}

enum LoopExit {
    Finished,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_rejects_empty_keyword() {
        let err = validate_request("  ", "Paris", Some(1), 20).unwrap_err();
        assert!(matches!(err, ScrapeError::Validation { .. }));
    }

    #[test]
    fn test_validation_rejects_empty_city() {
        let err = validate_request("energie", "", Some(1), 20).unwrap_err();
        assert!(matches!(err, ScrapeError::Validation { .. }));
    }

    #[test]
    fn test_validation_bounds_max_pages() {
        assert!(validate_request("energie", "Paris", Some(0), 20).is_err());
        assert!(validate_request("energie", "Paris", Some(21), 20).is_err());
        assert!(validate_request("energie", "Paris", Some(20), 20).is_ok());
    }

    #[test]
    fn test_validation_defaults_max_pages_to_one() {
        let request = validate_request("energie", "Paris", None, 20).unwrap();
        assert_eq!(request.max_pages, 1);
    }

    #[test]
    fn test_validation_trims_parameters() {
        let request = validate_request(" energie ", " Paris ", Some(2), 20).unwrap();
        assert_eq!(request.keyword, "energie");
        assert_eq!(request.city, "Paris");
    }
}
