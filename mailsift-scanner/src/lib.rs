pub mod canon;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod frontier;
pub mod limiter;
pub mod page;
pub mod policy;
pub mod result;
pub mod robots;

pub use canon::{CanonicalUrl, canonicalize};
pub use config::{CrawlConfig, DEFAULT_USER_AGENT, RetryPolicy};
pub use crawler::{Crawler, ProgressCallback};
pub use error::ScanError;
pub use extractor::{ContactCandidate, ContactExtractor, DiscoveryMethod};
pub use fetcher::{FetchOutcome, PageFetcher};
pub use frontier::FrontierOrigin;
pub use limiter::HostRateLimiter;
pub use result::{AuditEntry, ContactRecord, HostCrawl};
pub use robots::RobotsCache;
