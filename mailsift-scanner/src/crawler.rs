use crate::canon::{CanonicalUrl, canonicalize, same_host};
use crate::config::CrawlConfig;
use crate::error::Result;
use crate::fetcher::{FetchOutcome, PageFetcher, build_client};
use crate::frontier::{Frontier, FrontierEntry};
use crate::limiter::HostRateLimiter;
use crate::page::{PageAnalysis, PageAnalyzer};
use crate::policy::{ContactFilter, Verdict};
use crate::result::{AuditEntry, ContactRecord, HostCrawl, now};
use crate::robots::RobotsCache;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Called with the URL of every frontier entry taken off the queue.
pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Bounded, single-host crawl that collects contact records.
///
/// One `Crawler` can drive several host crawls at once; they share its HTTP client,
/// rate limiter, robots cache and connection ceiling.
pub struct Crawler {
    config: CrawlConfig,
    client: Client,
    fetcher: PageFetcher,
    analyzer: PageAnalyzer,
    filter: ContactFilter,
    progress_callback: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let limiter = Arc::new(HostRateLimiter::new(config.delay));
        Self::with_limiter(config, limiter)
    }

    /// Build a crawler that paces requests through an existing limiter, e.g. one
    /// also used for seed discovery.
    pub fn with_limiter(config: CrawlConfig, limiter: Arc<HostRateLimiter>) -> Result<Self> {
        config.validate()?;

        let client = build_client(&config)?;
        let robots = Arc::new(RobotsCache::new(
            client.clone(),
            config.user_agent.clone(),
            config.timeout,
        ));
        let fetcher = PageFetcher::new(client.clone(), robots, limiter, &config);
        let analyzer = PageAnalyzer::new(&config.org_keyword)?;
        let filter = ContactFilter::from_config(&config);

        Ok(Self {
            config,
            client,
            fetcher,
            analyzer,
            filter,
            progress_callback: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn limiter(&self) -> &Arc<HostRateLimiter> {
        self.fetcher.limiter()
    }

    pub fn robots(&self) -> &Arc<RobotsCache> {
        self.fetcher.robots()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Crawl the seed's host, visiting at most `max_pages` distinct URLs.
    ///
    /// Only an unusable seed URL is an error. Failed pages are recorded in the audit
    /// trail and skipped; cancellation returns what was collected so far.
    pub async fn crawl_host(&self, seed: &str, region: &str, max_pages: usize) -> Result<HostCrawl> {
        let seed = canonicalize(seed)?;
        info!("Crawling {} for {} (limit {} pages)", seed, region, max_pages);

        let mut frontier = Frontier::with_seed(seed.clone());
        let mut visited: HashSet<CanonicalUrl> = HashSet::new();
        let mut crawl = HostCrawl::default();

        while visited.len() < max_pages {
            if self.cancel.is_cancelled() {
                crawl.cancelled = true;
                break;
            }
            let Some(entry) = frontier.pop() else {
                break;
            };

            if let Some(ref callback) = self.progress_callback {
                callback(entry.url.to_string());
            }

            if !visited.insert(entry.url.clone()) {
                continue;
            }

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => {
                    crawl.cancelled = true;
                    break;
                }
                outcome = self.fetcher.fetch(&entry.url) => outcome,
            };

            let body = match outcome {
                FetchOutcome::Page(body) => body,
                FetchOutcome::DryRun => continue,
                FetchOutcome::Disallowed | FetchOutcome::Failed => {
                    crawl.audit.push(AuditEntry::unfetched(
                        entry.url.to_string(),
                        region.to_string(),
                        entry.origin,
                    ));
                    continue;
                }
            };

            let page = self.analyzer.analyze(&body, entry.url.as_str());
            self.collect_records(&entry, &page, region, &mut crawl);

            if entry.depth < self.config.max_depth {
                self.queue_links(&seed, &entry, &page, &visited, &mut frontier);
            }
        }

        crawl.pages_visited = visited.len();
        if crawl.cancelled {
            info!("Crawl of {} cancelled after {} pages", seed, crawl.pages_visited);
        } else {
            info!(
                "Crawl of {} finished: {} pages, {} records",
                seed,
                crawl.pages_visited,
                crawl.records.len()
            );
        }
        Ok(crawl)
    }

    fn collect_records(
        &self,
        entry: &FrontierEntry,
        page: &PageAnalysis,
        region: &str,
        crawl: &mut HostCrawl,
    ) {
        let signals = &page.signals;

        for candidate in &page.candidates {
            match self.filter.evaluate(candidate, signals) {
                Verdict::Accept => crawl.records.push(ContactRecord {
                    email: candidate.email.clone(),
                    name: signals.display_name.clone(),
                    region: region.to_string(),
                    source_url: entry.url.to_string(),
                    page_title: signals.title.clone(),
                    discovery_method: candidate.method,
                    discovered_at: now(),
                }),
                verdict => debug!("Dropping {} from {}: {:?}", candidate.email, entry.url, verdict),
            }
        }

        crawl.audit.push(AuditEntry {
            url: entry.url.to_string(),
            title: signals.title.clone(),
            region: region.to_string(),
            timestamp: now(),
            found_emails: page.candidates.iter().map(|c| c.email.clone()).collect(),
            opt_out_detected: signals.opt_out,
            source: entry.origin,
            fetched: true,
        });
    }

    fn queue_links(
        &self,
        seed: &CanonicalUrl,
        entry: &FrontierEntry,
        page: &PageAnalysis,
        visited: &HashSet<CanonicalUrl>,
        frontier: &mut Frontier,
    ) {
        for link in &page.links {
            let Some(next) = entry.url.join(&link.href) else {
                continue;
            };
            if !same_host(&next, seed) || visited.contains(&next) {
                continue;
            }
            frontier.push_link(next, entry.depth + 1, &link.href, &link.text);
        }
    }
}
