// Seed discovery through search-engine result pages

use mailsift_scanner::canon::canonicalize;
use mailsift_scanner::limiter::HostRateLimiter;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DUCKDUCKGO_BASE: &str = "https://duckduckgo.com";

static RESULT_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a").expect("result selector is valid"));
static ANY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Anything that turns a query into candidate site URLs.
pub trait SeedSource: Send + Sync {
    fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> impl Future<Output = Vec<String>> + Send;
}

/// Search queries used to find sites for one region, most specific last.
pub fn region_queries(region: &str) -> Vec<String> {
    vec![
        format!("OPG {}", region),
        format!("opg {} email", region),
        format!("kontakt OPG {}", region),
        format!("obiteljsko poljoprivredno gospodarstvo {}", region),
        format!("OPG {} kontakt email", region),
    ]
}

/// Run every region query in order and merge the results, keeping first-seen order.
pub async fn discover_region_seeds<S: SeedSource>(
    source: &S,
    region: &str,
    max_results: usize,
) -> Vec<String> {
    let mut seeds: Vec<String> = Vec::new();

    for query in region_queries(region) {
        for url in source.search(&query, max_results).await {
            let Ok(url) = canonicalize(&url) else {
                continue;
            };
            let url = url.to_string();
            if !seeds.contains(&url) {
                seeds.push(url);
            }
        }
        if seeds.len() >= max_results {
            break;
        }
    }

    seeds.truncate(max_results);
    info!("[{}] {} seed URLs discovered", region, seeds.len());
    seeds
}

/// DuckDuckGo's HTML endpoint.
pub struct DuckDuckGo {
    client: Client,
    limiter: Arc<HostRateLimiter>,
    base_url: String,
    timeout: Duration,
    dry_run: bool,
}

impl DuckDuckGo {
    pub fn new(client: Client, limiter: Arc<HostRateLimiter>) -> Self {
        Self {
            client,
            limiter,
            base_url: DUCKDUCKGO_BASE.to_string(),
            timeout: Duration::from_secs(20),
            dry_run: false,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn query_url(&self, query: &str) -> String {
        let mut url = format!("{}/html/", self.base_url);
        if let Ok(mut parsed) = Url::parse(&url) {
            parsed
                .query_pairs_mut()
                .append_pair("q", query)
                .append_pair("kl", "hr-hr");
            url = parsed.to_string();
        }
        url
    }

    async fn fetch_results_page(&self, url: &str) -> Option<String> {
        if self.dry_run {
            info!("[dry-run] GET {}", url);
            return None;
        }

        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        self.limiter.throttle(&host).await;

        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Search request {} failed: {}", url, e);
                return None;
            }
        };
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            debug!("Search rate limited: {}", url);
            return None;
        }
        if !response.status().is_success() {
            debug!("Search returned {} for {}", response.status(), url);
            return None;
        }
        response.text().await.ok()
    }
}

impl SeedSource for DuckDuckGo {
    async fn search(&self, query: &str, max_results: usize) -> Vec<String> {
        let url = self.query_url(query);
        match self.fetch_results_page(&url).await {
            Some(body) => parse_result_links(&body, max_results),
            None => Vec::new(),
        }
    }
}

/// Result links from a search page. Falls back to every link when the page has no
/// recognizable result anchors.
pub fn parse_result_links(html: &str, max_results: usize) -> Vec<String> {
    let document = Html::parse_document(html);

    let collect = |selector: &Selector| -> Vec<String> {
        document
            .select(selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(unwrap_redirect)
            .filter(|href| href.starts_with("http"))
            .filter_map(|href| canonicalize(&href).ok().map(|u| u.to_string()))
            .take(max_results)
            .collect()
    };

    let results = collect(&RESULT_LINKS);
    if !results.is_empty() {
        return results;
    }
    collect(&ANY_LINK)
}

/// DuckDuckGo wraps result targets as `/l/?uddg=<encoded url>`.
fn unwrap_redirect(href: &str) -> Option<String> {
    let href = href.trim();
    if !href.contains("uddg=") {
        return Some(href.to_string());
    }

    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("{}{}", DUCKDUCKGO_BASE, href)
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .map(|(_, target)| target.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_queries() {
        let queries = region_queries("Međimurska");
        assert_eq!(queries.len(), 5);
        assert_eq!(queries[0], "OPG Međimurska");
        assert_eq!(queries[3], "obiteljsko poljoprivredno gospodarstvo Međimurska");
    }

    #[test]
    fn test_unwrap_redirect() {
        assert_eq!(
            unwrap_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fopg-horvat.hr%2Fkontakt&rut=abc"),
            Some("https://opg-horvat.hr/kontakt".to_string())
        );
        assert_eq!(
            unwrap_redirect("https://opg-horvat.hr/"),
            Some("https://opg-horvat.hr/".to_string())
        );
    }

    #[test]
    fn test_query_url_is_encoded() {
        let client = Client::new();
        let ddg = DuckDuckGo::new(client, Arc::new(HostRateLimiter::default()))
            .with_base_url("http://127.0.0.1:8080/");
        assert_eq!(
            ddg.query_url("OPG Međimurska"),
            "http://127.0.0.1:8080/html/?q=OPG+Me%C4%91imurska&kl=hr-hr"
        );
    }
}
