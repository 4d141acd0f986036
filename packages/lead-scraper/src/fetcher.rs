//! Paced page fetcher.
//!
//! Wraps the browser driver with the anti-detection pacing contract:
//! a uniformly random delay before every fetch except a session's
//! first, a fixed user-agent identity (carried by the driver), a
//! per-fetch timeout, and bounded retries.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::retry::RetryPolicy;
use crate::traits::BrowserDriver;
use crate::types::RenderedPage;

pub struct PageFetcher<B> {
    driver: B,
    delay_ms: Range<u64>,
    timeout: Duration,
    retry: RetryPolicy,
    first_fetch_done: AtomicBool,
}

impl<B: BrowserDriver> PageFetcher<B> {
    pub fn new(driver: B, delay_ms: Range<u64>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            driver,
            delay_ms,
            timeout,
            retry,
            first_fetch_done: AtomicBool::new(false),
        }
    }

    /// Fetch one rendered page, pacing and retrying per policy.
    pub async fn fetch(&self, url: &str) -> FetchResult<RenderedPage> {
        // Pacing is an anti-detection contract, not an optimization:
        // uniform over the configured interval, skipped only for the
        // session's very first request.
        if self.first_fetch_done.swap(true, Ordering::SeqCst) {
            self.pace().await;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(e) if self.retry.should_retry(attempt) => {
                    tracing::warn!(url = %url, attempt = attempt, error = %e, "page fetch failed, retrying");
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> FetchResult<RenderedPage> {
        match tokio::time::timeout(self.timeout, self.driver.fetch_rendered_page(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    async fn pace(&self) {
        if self.delay_ms.is_empty() {
            return;
        }
        let delay = fastrand::u64(self.delay_ms.clone());
        tracing::debug!(delay_ms = delay, "pacing before fetch");
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::time::Instant;

    struct CannedDriver {
        fail_first: u32,
        calls: AtomicU32,
        slow: bool,
    }

    #[async_trait]
    impl BrowserDriver for CannedDriver {
        async fn fetch_rendered_page(&self, url: &str) -> FetchResult<RenderedPage> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if call < self.fail_first {
                return Err(FetchError::Network {
                    url: url.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(RenderedPage {
                url: url.to_string(),
                html: "<html></html>".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_first_fetch_is_not_paced() {
        let fetcher = PageFetcher::new(
            CannedDriver {
                fail_first: 0,
                calls: AtomicU32::new(0),
                slow: false,
            },
            500..501,
            Duration::from_secs(5),
            RetryPolicy::none(),
        );

        let start = Instant::now();
        fetcher.fetch("https://example.com/page1").await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(400));

        // Second fetch waits at least the lower bound.
        let start = Instant::now();
        fetcher.fetch("https://example.com/page2").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let fetcher = PageFetcher::new(
            CannedDriver {
                fail_first: 2,
                calls: AtomicU32::new(0),
                slow: false,
            },
            0..1,
            Duration::from_secs(5),
            RetryPolicy::new(3, 1),
        );

        let page = fetcher.fetch("https://example.com").await.unwrap();
        assert_eq!(page.url, "https://example.com");
        assert_eq!(fetcher.driver.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let fetcher = PageFetcher::new(
            CannedDriver {
                fail_first: 10,
                calls: AtomicU32::new(0),
                slow: false,
            },
            0..1,
            Duration::from_secs(5),
            RetryPolicy::new(2, 1),
        );

        let err = fetcher.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
        assert_eq!(fetcher.driver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_driver_times_out() {
        let fetcher = PageFetcher::new(
            CannedDriver {
                fail_first: 0,
                calls: AtomicU32::new(0),
                slow: true,
            },
            0..1,
            Duration::from_secs(1),
            RetryPolicy::none(),
        );

        let err = fetcher.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}
