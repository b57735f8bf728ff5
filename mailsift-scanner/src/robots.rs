//! robots.txt fetching and per-host policy caching.
//!
//! Politeness here is best-effort: anything that goes wrong while fetching or
//! evaluating a policy results in the URL being allowed.

use crate::canon::{CanonicalUrl, canonicalize};
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use texting_robots::Robot;
use tokio::sync::OnceCell;
use tracing::debug;

pub enum RobotsPolicy {
    AllowAll,
    Rules(Robot),
}

impl RobotsPolicy {
    pub fn parse(user_agent: &str, body: &[u8]) -> Self {
        match Robot::new(user_agent, body) {
            Ok(robot) => RobotsPolicy::Rules(robot),
            Err(e) => {
                debug!("Unparseable robots.txt, allowing all: {}", e);
                RobotsPolicy::AllowAll
            }
        }
    }

    pub fn allows(&self, url: &str) -> bool {
        match self {
            RobotsPolicy::AllowAll => true,
            RobotsPolicy::Rules(robot) => robot.allowed(url),
        }
    }

    pub fn is_allow_all(&self) -> bool {
        matches!(self, RobotsPolicy::AllowAll)
    }
}

type PolicySlot = Arc<OnceCell<Arc<RobotsPolicy>>>;

pub struct RobotsCache {
    client: Client,
    user_agent: String,
    timeout: Duration,
    policies: DashMap<String, PolicySlot>,
}

impl RobotsCache {
    pub fn new(client: Client, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            timeout,
            policies: DashMap::new(),
        }
    }

    /// Whether the configured user agent may fetch `url`.
    pub async fn allowed(&self, url: &str) -> bool {
        let Ok(url) = canonicalize(url) else {
            return true;
        };
        let policy = self.policy_for(&url).await;
        policy.allows(url.as_str())
    }

    /// Cached policy for the URL's host, fetching it on first use. Concurrent first
    /// lookups for one host share a single fetch.
    pub async fn policy_for(&self, url: &CanonicalUrl) -> Arc<RobotsPolicy> {
        let slot = self
            .policies
            .entry(url.host().to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        slot.get_or_init(|| async { Arc::new(self.fetch_policy(url).await) })
            .await
            .clone()
    }

    pub fn cached_hosts(&self) -> usize {
        self.policies.len()
    }

    async fn fetch_policy(&self, url: &CanonicalUrl) -> RobotsPolicy {
        let robots_url = url.robots_url();
        debug!("Fetching {}", robots_url);

        let response = match self
            .client
            .get(&robots_url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("robots.txt fetch error for {}: {}, allowing all", robots_url, e);
                return RobotsPolicy::AllowAll;
            }
        };

        if response.status() != StatusCode::OK {
            debug!(
                "robots.txt for {} returned {}, allowing all",
                robots_url,
                response.status()
            );
            return RobotsPolicy::AllowAll;
        }

        match response.bytes().await {
            Ok(body) => RobotsPolicy::parse(&self.user_agent, &body),
            Err(e) => {
                debug!("Failed to read robots.txt body for {}: {}", robots_url, e);
                RobotsPolicy::AllowAll
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const AGENT: &str = "mailsift-test/1.0";

    fn cache() -> RobotsCache {
        RobotsCache::new(Client::new(), AGENT, Duration::from_secs(2))
    }

    #[test]
    fn test_parse_basic_rules() {
        let body = b"User-agent: *\nDisallow: /private\nAllow: /\n";
        let policy = RobotsPolicy::parse(AGENT, body);
        assert!(policy.allows("https://example.com/"));
        assert!(!policy.allows("https://example.com/private/secret.html"));
    }

    #[tokio::test]
    async fn test_rules_are_applied_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin\n"))
            .expect(1)
            .mount(&server)
            .await;

        let robots = cache();
        assert!(robots.allowed(&format!("{}/", server.uri())).await);
        assert!(!robots.allowed(&format!("{}/admin/panel", server.uri())).await);
        assert!(robots.allowed(&format!("{}/kontakt", server.uri())).await);
        assert_eq!(robots.cached_hosts(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_lookups_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /admin\n")
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let robots = Arc::new(cache());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let robots = robots.clone();
                let url = if i % 2 == 0 {
                    format!("{}/kontakt", server.uri())
                } else {
                    format!("{}/admin/{}", server.uri(), i)
                };
                tokio::spawn(async move { robots.allowed(&url).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), i % 2 == 0);
        }
        assert_eq!(robots.cached_hosts(), 1);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_server_error_fails_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let robots = cache();
        assert!(robots.allowed(&format!("{}/anything", server.uri())).await);
        assert!(robots.allowed(&format!("{}/admin", server.uri())).await);
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_open() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let robots = cache();
        let url = canonicalize(&format!("http://127.0.0.1:{}/private", port)).unwrap();
        let policy = robots.policy_for(&url).await;
        assert!(policy.is_allow_all());
        assert!(robots.allowed(url.as_str()).await);
    }

    #[tokio::test]
    async fn test_unparseable_url_is_allowed() {
        let robots = cache();
        assert!(robots.allowed("::not a url::").await);
        assert_eq!(robots.cached_hosts(), 0);
    }
}
