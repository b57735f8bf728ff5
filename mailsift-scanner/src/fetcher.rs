use crate::canon::CanonicalUrl;
use crate::config::{CrawlConfig, RetryPolicy};
use crate::error::Result;
use crate::limiter::HostRateLimiter;
use crate::robots::RobotsCache;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// What a fetch produced. Only `Page` carries content; every other variant is
/// treated by the crawler as an empty page.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Page(String),
    Disallowed,
    DryRun,
    Failed,
}

enum Attempt {
    Done(String),
    Retry(String),
    GiveUp(String),
}

/// Build the HTTP client shared by the fetcher, the robots cache and seed discovery.
pub fn build_client(config: &CrawlConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout)
        .connect_timeout(config.timeout / 2)
        .pool_max_idle_per_host(config.max_connections)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// HTTP GET gated by robots.txt and the per-host rate limiter, with bounded retries.
pub struct PageFetcher {
    client: Client,
    robots: Arc<RobotsCache>,
    limiter: Arc<HostRateLimiter>,
    connections: Arc<Semaphore>,
    retry: RetryPolicy,
    timeout: Duration,
    dry_run: bool,
}

impl PageFetcher {
    pub fn new(
        client: Client,
        robots: Arc<RobotsCache>,
        limiter: Arc<HostRateLimiter>,
        config: &CrawlConfig,
    ) -> Self {
        Self {
            client,
            robots,
            limiter,
            connections: Arc::new(Semaphore::new(config.max_connections)),
            retry: config.retry.clone(),
            timeout: config.timeout,
            dry_run: config.dry_run,
        }
    }

    pub fn limiter(&self) -> &Arc<HostRateLimiter> {
        &self.limiter
    }

    pub fn robots(&self) -> &Arc<RobotsCache> {
        &self.robots
    }

    pub async fn fetch(&self, url: &CanonicalUrl) -> FetchOutcome {
        if self.dry_run {
            info!("[dry-run] GET {}", url);
            return FetchOutcome::DryRun;
        }

        if !self.robots.allowed(url.as_str()).await {
            debug!("Robots disallow: {}", url);
            return FetchOutcome::Disallowed;
        }

        for attempt in 1..=self.retry.max_attempts {
            match self.attempt(url).await {
                Attempt::Done(body) => return FetchOutcome::Page(body),
                Attempt::GiveUp(reason) => {
                    debug!("Giving up on {}: {}", url, reason);
                    return FetchOutcome::Failed;
                }
                Attempt::Retry(reason) => {
                    debug!(
                        "Fetch attempt {}/{} for {} failed: {}",
                        attempt, self.retry.max_attempts, url, reason
                    );
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                    }
                }
            }
        }

        debug!("Exhausted retries for {}", url);
        FetchOutcome::Failed
    }

    async fn attempt(&self, url: &CanonicalUrl) -> Attempt {
        self.limiter.throttle(url.host()).await;

        let Ok(_permit) = self.connections.acquire().await else {
            return Attempt::GiveUp("connection pool closed".to_string());
        };

        let response = match self
            .client
            .get(url.as_str())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            return Attempt::Retry(format!("status {}", status));
        }
        if !status.is_success() {
            return Attempt::GiveUp(format!("status {}", status));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase());
        if !is_textual(content_type.as_deref()) {
            return Attempt::GiveUp(format!("non-HTML content type {:?}", content_type));
        }

        match response.text().await {
            Ok(body) => Attempt::Done(body),
            Err(e) => Attempt::Retry(e.to_string()),
        }
    }
}

fn is_textual(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => ct.contains("html") || ct.starts_with("text/"),
    }
}
