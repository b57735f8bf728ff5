//! URL canonicalization and email normalization.
//!
//! Everything that needs to compare two URLs or two addresses goes through here,
//! so visited-set membership, host keys and record dedup all agree.

use crate::error::{Result, ScanError};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use url::{ParseError, Url};

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-']{1,64}@[A-Za-z0-9.-]{1,253}\.[A-Za-z]{2,63}$")
        .expect("email pattern is valid")
});

/// Characters stripped from both ends of a raw address before validation.
const EMAIL_TRIM: &[char] = &[
    '.', ',', ';', ':', '<', '>', '(', ')', '[', ']', '{', '}', '\'', '"',
];

/// An absolute http(s) URL with a host, no fragment and no empty query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Lower-cased hostname; the key for rate limiting and robots caching.
    pub fn host(&self) -> &str {
        // canonicalize() refuses URLs without a host
        self.0.host_str().unwrap_or_default()
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Resolve `href` relative to this URL. Non-http(s) targets yield `None`.
    pub fn join(&self, href: &str) -> Option<CanonicalUrl> {
        let resolved = self.0.join(href.trim()).ok()?;
        from_url(resolved).ok()
    }

    pub fn robots_url(&self) -> String {
        match self.0.port() {
            Some(port) => format!("{}://{}:{}/robots.txt", self.scheme(), self.host(), port),
            None => format!("{}://{}/robots.txt", self.scheme(), self.host()),
        }
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Parse and normalize a URL: scheme defaults to `http`, path to `/`,
/// the fragment is dropped and the query string is kept.
pub fn canonicalize(raw: &str) -> Result<CanonicalUrl> {
    let raw = raw.trim();
    let with_default_scheme = || {
        Url::parse(&format!("http://{}", raw))
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))
    };
    let parsed = match Url::parse(raw) {
        // `host:port/path` parses with the host as its scheme
        Ok(url) if !raw.contains("://") && looks_like_host(url.scheme()) => with_default_scheme()?,
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => with_default_scheme()?,
        Err(e) => return Err(ScanError::InvalidUrl(format!("{}: {}", raw, e))),
    };
    from_url(parsed)
}

fn looks_like_host(scheme: &str) -> bool {
    scheme == "localhost" || scheme.contains('.')
}

fn from_url(mut url: Url) -> Result<CanonicalUrl> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl(format!(
            "unsupported scheme '{}' in {}",
            url.scheme(),
            url
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScanError::InvalidUrl(format!("no host in {}", url)));
    }
    url.set_fragment(None);
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(CanonicalUrl(url))
}

/// Compare the hostnames of two URLs, ignoring case. `www.` is significant.
pub fn same_host(a: &CanonicalUrl, b: &CanonicalUrl) -> bool {
    a.host().eq_ignore_ascii_case(b.host())
}

/// Trim surrounding punctuation and lower-case the domain part only.
pub fn normalize_email(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(EMAIL_TRIM).trim();
    match trimmed.split_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => trimmed.to_lowercase(),
    }
}

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_SHAPE.is_match(candidate)
}

/// Identity key for an address. Case never distinguishes two addresses.
pub fn email_key(email: &str) -> String {
    email.to_lowercase()
}
