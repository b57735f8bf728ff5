use crate::discovery::{SeedSource, discover_region_seeds};
use crate::regions::default_regions;
use anyhow::{Result, bail};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use mailsift_scanner::canon::{canonicalize, email_key};
use mailsift_scanner::{AuditEntry, ContactRecord, Crawler, HostCrawl};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Pages a single host may consume, whatever the remaining region budget.
pub const MAX_PAGES_PER_HOST: usize = 50;
/// Pages a host gets even when the region budget is nearly spent.
pub const MIN_PAGES_PER_HOST: usize = 5;
/// Seeds crawled per host.
pub const SEEDS_PER_HOST: usize = 2;

/// Options for a region run
pub struct RunOptions {
    pub regions: Vec<String>,
    pub max_results_per_region: usize,
    pub max_pages_per_region: usize,
    /// Host crawls in flight at once within a region.
    pub host_concurrency: usize,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            max_results_per_region: 50,
            max_pages_per_region: 200,
            host_concurrency: 2,
            show_progress: true,
        }
    }
}

/// One planned host crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostJob {
    pub host: String,
    pub seed: String,
    pub max_pages: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSummary {
    pub region: String,
    pub seeds: usize,
    pub pages_visited: usize,
    pub records: usize,
}

/// Everything a run produced. `records` are already deduplicated.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub records: Vec<ContactRecord>,
    pub audit: Vec<AuditEntry>,
    pub regions: Vec<RegionSummary>,
    pub cancelled: bool,
    pub dry_run: bool,
}

/// Split a region's page budget across the hosts its seeds point at.
///
/// Seeds that cannot be crawled are dropped before any budget is charged.
/// Hosts are taken in first-seen order. Each host's allowance is the remaining
/// budget clamped to `[MIN_PAGES_PER_HOST, MAX_PAGES_PER_HOST]`; its first
/// `SEEDS_PER_HOST` seeds each become a job with that allowance, and every job is
/// charged against the budget.
pub fn plan_host_crawls(seeds: &[String], budget: usize) -> Vec<HostJob> {
    let mut by_host: Vec<(String, Vec<&String>)> = Vec::new();
    for seed in seeds {
        let host = match canonicalize(seed) {
            Ok(url) => url.host().to_string(),
            Err(e) => {
                warn!("Skipping seed {}: {}", seed, e);
                continue;
            }
        };
        match by_host.iter_mut().find(|(h, _)| *h == host) {
            Some((_, host_seeds)) => host_seeds.push(seed),
            None => by_host.push((host, vec![seed])),
        }
    }

    let mut jobs = Vec::new();
    let mut remaining = budget as i64;

    'hosts: for (host, host_seeds) in by_host {
        if remaining <= 0 {
            break;
        }
        let allowance = (remaining as usize).clamp(MIN_PAGES_PER_HOST, MAX_PAGES_PER_HOST);

        for seed in host_seeds.into_iter().take(SEEDS_PER_HOST) {
            jobs.push(HostJob {
                host: host.clone(),
                seed: seed.clone(),
                max_pages: allowance,
            });
            remaining -= allowance as i64;
            if remaining <= 0 {
                break 'hosts;
            }
        }
    }

    jobs
}

/// Crawl one region's seeds according to `plan_host_crawls`.
///
/// Up to `concurrency` host crawls run at once; results are merged in plan order.
/// A host whose seed cannot be crawled is logged and skipped.
pub async fn crawl_region(
    crawler: &Crawler,
    region: &str,
    seeds: &[String],
    budget: usize,
    concurrency: usize,
) -> HostCrawl {
    let jobs = plan_host_crawls(seeds, budget);
    for job in &jobs {
        info!("[{}] Crawl host {} (limit {})", region, job.host, job.max_pages);
    }

    let results: Vec<_> = stream::iter(jobs)
        .map(|job| async move {
            let result = crawler.crawl_host(&job.seed, region, job.max_pages).await;
            (job, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut total = HostCrawl::default();
    for (job, result) in results {
        match result {
            Ok(crawl) => total.extend(crawl),
            Err(e) => warn!("[{}] Failed to crawl {}: {}", region, job.seed, e),
        }
    }
    total
}

/// Keep the first record for every address, comparing case-insensitively.
pub fn dedup_records(records: Vec<ContactRecord>) -> Vec<ContactRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(email_key(&record.email)))
        .collect()
}

struct PageProgress {
    bar: Option<Arc<ProgressBar>>,
    count: Arc<AtomicUsize>,
}

impl PageProgress {
    fn new(enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Starting crawl...");
            Arc::new(pb)
        });
        Self {
            bar,
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Attach a page counter to the crawler.
    fn attach(&self, crawler: Crawler) -> Crawler {
        let Some(bar) = self.bar.clone() else {
            return crawler;
        };
        let count = self.count.clone();
        crawler.with_progress_callback(Arc::new(move |_url: String| {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            bar.set_message(format!("Crawling... {} pages processed", n));
            bar.tick();
        }))
    }

    fn message(&self, msg: String) {
        if let Some(ref bar) = self.bar {
            bar.set_message(msg);
        }
    }

    fn finish(&self) {
        if let Some(ref bar) = self.bar {
            let total = self.count.load(Ordering::Relaxed);
            bar.finish_with_message(format!("Crawl complete! {} pages processed", total));
        }
    }
}

/// Discover seeds for every region and crawl them.
///
/// Regions run one after another. A dry run stops after discovery. When the
/// crawler's cancellation token fires, the run stops and returns what it has.
pub async fn execute_run<S: SeedSource>(
    options: RunOptions,
    source: &S,
    crawler: Crawler,
) -> Result<RunOutcome> {
    let RunOptions {
        regions,
        max_results_per_region,
        max_pages_per_region,
        host_concurrency,
        show_progress,
    } = options;

    if regions.is_empty() {
        bail!("no regions to crawl");
    }
    info!("Regions: {}", regions.join(", "));

    let dry_run = crawler.config().dry_run;
    let cancel = crawler.cancellation().clone();
    let progress = PageProgress::new(show_progress && !dry_run);
    let crawler = progress.attach(crawler);

    let mut outcome = RunOutcome {
        dry_run,
        ..RunOutcome::default()
    };
    let mut records = Vec::new();

    for region in &regions {
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        progress.message(format!("[{}] Searching for seeds...", region));
        let seeds = tokio::select! {
            _ = cancel.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            seeds = discover_region_seeds(source, region, max_results_per_region) => seeds,
        };

        if dry_run {
            for seed in &seeds {
                info!("[dry-run] plan crawl seed: {}", seed);
            }
            outcome.regions.push(RegionSummary {
                region: region.clone(),
                seeds: seeds.len(),
                ..RegionSummary::default()
            });
            continue;
        }

        let crawl = crawl_region(
            &crawler,
            region,
            &seeds,
            max_pages_per_region,
            host_concurrency,
        )
        .await;

        outcome.regions.push(RegionSummary {
            region: region.clone(),
            seeds: seeds.len(),
            pages_visited: crawl.pages_visited,
            records: crawl.records.len(),
        });
        outcome.cancelled |= crawl.cancelled;
        records.extend(crawl.records);
        outcome.audit.extend(crawl.audit);

        if outcome.cancelled {
            break;
        }
    }

    progress.finish();
    outcome.records = dedup_records(records);
    Ok(outcome)
}

/// Crawl a fixed list of seeds for one region, skipping discovery. Every seed gets
/// its own `max_pages` allowance.
pub async fn execute_seed_crawl(
    crawler: Crawler,
    region: &str,
    seeds: Vec<String>,
    max_pages: usize,
    concurrency: usize,
    show_progress: bool,
) -> RunOutcome {
    let dry_run = crawler.config().dry_run;
    let progress = PageProgress::new(show_progress && !dry_run);
    let crawler = progress.attach(crawler);

    let results: Vec<_> = stream::iter(seeds.iter())
        .map(|seed| {
            let crawler = &crawler;
            async move { (seed, crawler.crawl_host(seed, region, max_pages).await) }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut total = HostCrawl::default();
    for (seed, result) in results {
        match result {
            Ok(crawl) => total.extend(crawl),
            Err(e) => warn!("[{}] Failed to crawl {}: {}", region, seed, e),
        }
    }
    progress.finish();

    RunOutcome {
        regions: vec![RegionSummary {
            region: region.to_string(),
            seeds: seeds.len(),
            pages_visited: total.pages_visited,
            records: total.records.len(),
        }],
        records: dedup_records(total.records),
        audit: total.audit,
        cancelled: total.cancelled,
        dry_run,
    }
}
