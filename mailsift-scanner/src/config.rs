use crate::error::{Result, ScanError};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "mailsift/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/trapdoorsec/mailsift)"
);

/// How failed fetches are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep before the second attempt; doubled after each further failure.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Everything the crawl engine needs to know about one run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_depth: usize,
    pub max_pages: usize,
    pub timeout: Duration,
    /// Minimum gap between two requests to the same host.
    pub delay: Duration,
    pub include_role_emails: bool,
    pub respect_opt_out: bool,
    /// Log planned requests instead of performing them.
    pub dry_run: bool,
    pub user_agent: String,
    /// Ceiling on simultaneous outbound requests across all hosts.
    pub max_connections: usize,
    pub retry: RetryPolicy,
    /// Word identifying the kind of organization being collected ("opg").
    pub org_keyword: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 50,
            timeout: Duration::from_secs(20),
            delay: Duration::from_secs(1),
            include_role_emails: false,
            respect_opt_out: false,
            dry_run: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_connections: 10,
            retry: RetryPolicy::default(),
            org_keyword: "opg".to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_role_emails(mut self, include: bool) -> Self {
        self.include_role_emails = include;
        self
    }

    pub fn with_opt_out_respected(mut self, respect: bool) -> Self {
        self.respect_opt_out = respect;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_connections(mut self, connections: usize) -> Self {
        self.max_connections = connections;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_org_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.org_keyword = keyword.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ScanError::Config("timeout must be greater than zero".into()));
        }
        if self.max_connections == 0 {
            return Err(ScanError::Config("max_connections must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ScanError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ScanError::Config("user agent must not be empty".into()));
        }
        if self.org_keyword.trim().is_empty() {
            return Err(ScanError::Config("organization keyword must not be empty".into()));
        }
        Ok(())
    }
}
