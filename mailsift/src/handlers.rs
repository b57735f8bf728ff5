use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use mailsift_core::crawl::{RunOptions, RunOutcome, execute_run, execute_seed_crawl};
use mailsift_core::discovery::DuckDuckGo;
use mailsift_core::regions::resolve_regions;
use mailsift_core::report::{generate_run_summary, save_run};
use mailsift_scanner::{CrawlConfig, Crawler, HostRateLimiter, canonicalize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use url::Url;

// Helper functions for crawl handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(url: Option<&Url>, hosts_file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        let url = canonicalize(url.as_str())?;
        Ok(vec![url.to_string()])
    } else {
        bail!("Either --url or --hosts-file must be provided")
    }
}

/// Load and parse URLs from a file. Blank lines and `#` comments are skipped.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Canonical form of a URL line; a missing scheme means `http://`.
pub fn parse_url_line(line: &str) -> Option<String> {
    match canonicalize(line) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            warn!("Skipping invalid URL '{}': {}", line, e);
            None
        }
    }
}

/// Expand `~` in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!(
        "warn,mailsift={level},mailsift_core={level},mailsift_scanner={level}",
        level = level
    )
}

/// Log to stderr, and to `log_file` without colors when given. `RUST_LOG` overrides
/// the default filter.
pub fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

fn init_tracing_from(args: &ArgMatches) -> Result<()> {
    let log_file = args.get_one::<String>("log-file").map(|p| expand_path(p));
    init_tracing(args.get_flag("verbose"), log_file.as_deref())
}

/// Map the shared crawl flags onto a `CrawlConfig`.
pub fn build_config(args: &ArgMatches) -> Result<CrawlConfig> {
    let depth = *args.get_one::<usize>("depth").unwrap_or(&2);
    let timeout = *args.get_one::<u64>("timeout").unwrap_or(&20);
    let delay = *args.get_one::<f64>("delay").unwrap_or(&1.0);

    let delay = Duration::try_from_secs_f64(delay)
        .map_err(|_| anyhow!("--delay must be a non-negative number of seconds"))?;

    let config = CrawlConfig::default()
        .with_max_depth(depth)
        .with_timeout(Duration::from_secs(timeout))
        .with_delay(delay)
        .with_dry_run(args.get_flag("dry-run"))
        .with_opt_out_respected(args.get_flag("respect-opt-out"))
        .with_role_emails(args.get_flag("include-role-emails"));
    config.validate()?;
    Ok(config)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Persist and report a finished run.
fn finish_run(outcome: &RunOutcome, output: &Path) -> Result<()> {
    if outcome.dry_run {
        info!("Dry run finished; no CSV written");
    } else {
        let audit_path = save_run(output, outcome)
            .with_context(|| format!("Failed to write results to {}", output.display()))?;
        info!(
            "Wrote {} unique email addresses to {}",
            outcome.records.len(),
            output.display()
        );
        info!("Audit trail saved to {}", audit_path.display());
    }

    print!("{}", generate_run_summary(outcome));
    print_divider();
    if outcome.cancelled {
        println!("{} Interrupted, partial results kept", "⚠".yellow().bold());
    } else if outcome.dry_run {
        println!("{} Dry run complete", "✓".green().bold());
    } else {
        println!(
            "{} {} unique addresses in {}",
            "✓".green().bold(),
            outcome.records.len().to_string().bright_white(),
            output.display().to_string().bright_white()
        );
    }
    Ok(())
}

pub async fn handle_run(args: &ArgMatches, cancel: CancellationToken) -> Result<RunOutcome> {
    init_tracing_from(args)?;
    let config = build_config(args)?;

    let explicit: Vec<String> = args
        .get_many::<String>("REGIONS")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let regions_file = args.get_one::<String>("regions-file").map(|p| expand_path(p));
    let regions = resolve_regions(&explicit, regions_file.as_deref())?;

    let output = expand_path(
        args.get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or("opg_emails.csv"),
    );

    let options = RunOptions {
        regions,
        max_results_per_region: *args.get_one::<usize>("max-results-per-region").unwrap_or(&50),
        max_pages_per_region: *args.get_one::<usize>("max-pages-per-region").unwrap_or(&200),
        host_concurrency: *args.get_one::<usize>("concurrency").unwrap_or(&2),
        show_progress: !args.get_flag("no-progress"),
    };

    let limiter = Arc::new(HostRateLimiter::new(config.delay));
    let timeout = config.timeout;
    let dry_run = config.dry_run;
    let crawler = Crawler::with_limiter(config, limiter.clone())?.with_cancellation(cancel);
    let search = DuckDuckGo::new(crawler.client().clone(), limiter)
        .with_timeout(timeout)
        .with_dry_run(dry_run);

    let outcome = execute_run(options, &search, crawler).await?;
    finish_run(&outcome, &output)?;
    Ok(outcome)
}

pub async fn handle_crawl(args: &ArgMatches, cancel: CancellationToken) -> Result<RunOutcome> {
    init_tracing_from(args)?;
    let config = build_config(args)?;

    let url = args.get_one::<Url>("url");
    let hosts_file = args.get_one::<String>("hosts-file").map(|p| expand_path(p));
    let urls = load_urls_from_source(url, hosts_file.as_deref())?;

    let region = args
        .get_one::<String>("region")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    let max_pages = *args.get_one::<usize>("max-pages").unwrap_or(&50);
    let concurrency = *args.get_one::<usize>("concurrency").unwrap_or(&2);
    let output = expand_path(
        args.get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or("opg_emails.csv"),
    );

    info!("Crawling {} site(s) for region {}", urls.len(), region);
    let crawler = Crawler::new(config)?.with_cancellation(cancel);
    let outcome = execute_seed_crawl(
        crawler,
        &region,
        urls,
        max_pages,
        concurrency,
        !args.get_flag("no-progress"),
    )
    .await;

    finish_run(&outcome, &output)?;
    Ok(outcome)
}
