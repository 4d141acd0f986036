//! Crawl policy checker: robots.txt retrieval, parsing, and a
//! per-host decision cache.
//!
//! Fail-closed: if the rules document cannot be retrieved or parsed,
//! the host is treated as off limits. Scraping into policy
//! uncertainty is worse than a missed page.

use std::collections::HashMap;
use tokio::sync::Mutex;
use url::Url;

use crate::retry::RetryPolicy;
use crate::traits::RobotsFetcher;
use crate::types::CrawlDecision;

/// Parsed robots.txt rules, reduced to what the checker needs:
/// disallow/allow prefixes per user-agent group.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Rules per user-agent token (lowercase).
    agents: HashMap<String, PathRules>,

    /// Rules for the wildcard agent (`*`).
    default_rules: PathRules,
}

#[derive(Debug, Clone, Default)]
struct PathRules {
    disallow: Vec<String>,
    allow: Vec<String>,
}

impl RobotsRules {
    /// Parse a robots.txt body. Unknown directives are ignored.
    pub fn parse(content: &str) -> Self {
        let mut rules = Self::default();
        let mut current_agents: Vec<String> = Vec::new();
        let mut current = PathRules::default();
        let mut seen_directive = false;

        let mut flush =
            |agents: &mut Vec<String>, current: &mut PathRules, rules: &mut RobotsRules| {
                for agent in agents.drain(..) {
                    if agent == "*" {
                        rules.default_rules = current.clone();
                    } else {
                        rules.agents.insert(agent, current.clone());
                    }
                }
                *current = PathRules::default();
            };

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    // A user-agent line after path directives starts a new group.
                    if seen_directive {
                        flush(&mut current_agents, &mut current, &mut rules);
                        seen_directive = false;
                    }
                    current_agents.push(value.to_lowercase());
                }
                "disallow" => {
                    seen_directive = true;
                    if !value.is_empty() {
                        current.disallow.push(value.to_string());
                    }
                }
                "allow" => {
                    seen_directive = true;
                    if !value.is_empty() {
                        current.allow.push(value.to_string());
                    }
                }
                _ => {}
            }
        }
        flush(&mut current_agents, &mut current, &mut rules);

        rules
    }

    /// Check whether a path is allowed for a user-agent. Allow rules
    /// take precedence over disallow rules.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let agent_lower = user_agent.to_lowercase();

        let rules = self
            .agents
            .iter()
            .find(|(token, _)| agent_lower.contains(token.as_str()))
            .map(|(_, r)| r)
            .unwrap_or(&self.default_rules);

        for allow in &rules.allow {
            if path.starts_with(allow.as_str()) {
                return true;
            }
        }

        for disallow in &rules.disallow {
            if disallow == "/" || path.starts_with(disallow.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Checks the crawl policy for target URLs, caching one decision per
/// host for the lifetime of the checker (one per session).
pub struct PolicyChecker<R> {
    fetcher: R,
    user_agent: String,
    retry: RetryPolicy,
    cache: Mutex<HashMap<String, CrawlDecision>>,
}

impl<R: RobotsFetcher> PolicyChecker<R> {
    pub fn new(fetcher: R, user_agent: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            user_agent: user_agent.into(),
            retry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the crawl path of `target` may be fetched. Invariant:
    /// at most one robots.txt fetch per host per checker lifetime.
    pub async fn check(&self, target: &Url) -> bool {
        let Some(host) = target.host_str() else {
            return false;
        };

        let mut cache = self.cache.lock().await;
        if let Some(decision) = cache.get(host) {
            return decision.allowed;
        }

        let allowed = self.fetch_decision(target).await;
        tracing::info!(host = %host, allowed = allowed, "crawl policy decision");

        cache.insert(
            host.to_string(),
            CrawlDecision {
                host: host.to_string(),
                allowed,
                checked_at: chrono::Utc::now(),
            },
        );
        allowed
    }

    async fn fetch_decision(&self, target: &Url) -> bool {
        let origin = target.origin().ascii_serialization();

        let mut attempt = 0;
        let body = loop {
            attempt += 1;
            match self.fetcher.fetch_robots(&origin).await {
                Ok(body) => break body,
                Err(e) if self.retry.should_retry(attempt) => {
                    tracing::warn!(origin = %origin, attempt = attempt, error = %e, "robots.txt fetch failed, retrying");
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                }
                Err(e) => {
                    tracing::warn!(origin = %origin, error = %e, "robots.txt unavailable, blocking crawl");
                    return false;
                }
            }
        };

        RobotsRules::parse(&body).is_allowed(&self.user_agent, target.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_and_check_basic() {
        let rules = RobotsRules::parse(
            "User-agent: *\n\
             Disallow: /private/\n\
             Disallow: /admin/\n\
             Allow: /private/open/\n",
        );
        assert!(rules.is_allowed("AnyBot", "/recherche/paris"));
        assert!(!rules.is_allowed("AnyBot", "/private/data"));
        assert!(rules.is_allowed("AnyBot", "/private/open/page"));
    }

    #[test]
    fn test_specific_agent_group() {
        let rules = RobotsRules::parse(
            "User-agent: *\n\
             Disallow:\n\
             \n\
             User-agent: chrome\n\
             Disallow: /recherche\n",
        );
        assert!(!rules.is_allowed("Mozilla/5.0 Chrome/120.0", "/recherche/paris"));
        assert!(rules.is_allowed("OtherAgent", "/recherche/paris"));
    }

    #[test]
    fn test_disallow_all() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /\n");
        assert!(!rules.is_allowed("Bot", "/anything"));
    }

    #[test]
    fn test_empty_rules_allow_everything() {
        let rules = RobotsRules::parse("");
        assert!(rules.is_allowed("Bot", "/any/path"));
    }

    struct CannedRobots {
        body: Option<String>,
        fetches: AtomicU32,
    }

    #[async_trait]
    impl RobotsFetcher for CannedRobots {
        async fn fetch_robots(&self, origin: &str) -> FetchResult<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.body.clone().ok_or(FetchError::Network {
                url: format!("{}/robots.txt", origin),
                reason: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_check_caches_per_host() {
        let checker = PolicyChecker::new(
            CannedRobots {
                body: Some("User-agent: *\nDisallow:\n".to_string()),
                fetches: AtomicU32::new(0),
            },
            "TestAgent",
            RetryPolicy::none(),
        );

        let url: Url = "https://example.com/recherche/paris?page=1".parse().unwrap();
        assert!(checker.check(&url).await);
        assert!(checker.check(&url).await);
        assert_eq!(checker.fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_rules_block_crawl() {
        let checker = PolicyChecker::new(
            CannedRobots {
                body: None,
                fetches: AtomicU32::new(0),
            },
            "TestAgent",
            RetryPolicy::none(),
        );

        let url: Url = "https://example.com/recherche".parse().unwrap();
        assert!(!checker.check(&url).await);
    }

    #[tokio::test]
    async fn test_disallowed_path_blocks_crawl() {
        let checker = PolicyChecker::new(
            CannedRobots {
                body: Some("User-agent: *\nDisallow: /recherche\n".to_string()),
                fetches: AtomicU32::new(0),
            },
            "TestAgent",
            RetryPolicy::none(),
        );

        let url: Url = "https://example.com/recherche/paris".parse().unwrap();
        assert!(!checker.check(&url).await);
    }
}
