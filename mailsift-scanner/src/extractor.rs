use crate::canon::{email_key, is_valid_email, normalize_email};
use regex::Regex;
use scraper::{Html, Node, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

static MAILTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mailto:([^?\s#]+)").expect("mailto pattern is valid"));

pub(crate) static EMAIL_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-']{1,64}@[A-Za-z0-9.-]{1,253}\.[A-Za-z]{2,63}")
        .expect("email pattern is valid")
});

static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("json-ld selector is valid")
});

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Which extraction pass produced a candidate. Pass order doubles as precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscoveryMethod {
    #[serde(rename = "mailto")]
    Mailto,
    #[serde(rename = "json-ld")]
    JsonLd,
    #[serde(rename = "regex")]
    Regex,
}

impl DiscoveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMethod::Mailto => "mailto",
            DiscoveryMethod::JsonLd => "json-ld",
            DiscoveryMethod::Regex => "regex",
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactCandidate {
    pub email: String,
    pub method: DiscoveryMethod,
}

/// Pulls email addresses out of a page through mailto links, JSON-LD blocks and
/// the visible text, in that order.
#[derive(Debug, Default, Clone)]
pub struct ContactExtractor;

impl ContactExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str, base_url: &str) -> Vec<ContactCandidate> {
        let document = Html::parse_document(html);
        let text = visible_text(&document);
        self.extract_parsed(&document, &text, base_url)
    }

    /// Same as [`extract`](Self::extract) for a document that is already parsed and
    /// whose visible text is already known.
    pub fn extract_parsed(
        &self,
        document: &Html,
        text: &str,
        base_url: &str,
    ) -> Vec<ContactCandidate> {
        let mut found = Candidates::default();

        for raw in mailto_addresses(document) {
            found.offer(&raw, DiscoveryMethod::Mailto);
        }
        for raw in json_ld_addresses(document, base_url) {
            found.offer(&raw, DiscoveryMethod::JsonLd);
        }
        for m in EMAIL_IN_TEXT.find_iter(text) {
            found.offer(m.as_str(), DiscoveryMethod::Regex);
        }

        found.into_vec()
    }
}

#[derive(Default)]
struct Candidates {
    seen: HashSet<String>,
    ordered: Vec<ContactCandidate>,
}

impl Candidates {
    fn offer(&mut self, raw: &str, method: DiscoveryMethod) {
        let email = normalize_email(raw);
        if !is_valid_email(&email) {
            return;
        }
        if self.seen.insert(email_key(&email)) {
            self.ordered.push(ContactCandidate { email, method });
        }
    }

    fn into_vec(self) -> Vec<ContactCandidate> {
        self.ordered
    }
}

fn mailto_addresses(document: &Html) -> Vec<String> {
    document
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| MAILTO.captures(href))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn json_ld_addresses(document: &Html, base_url: &str) -> Vec<String> {
    let mut out = Vec::new();
    for script in document.select(&JSON_LD) {
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => collect_json_ld(&value, &mut out),
            Err(e) => debug!("Skipping malformed JSON-LD on {}: {}", base_url, e),
        }
    }
    out
}

fn collect_json_ld(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(email) = map.get("email") {
                push_email_value(email, out);
            }
            if let Some(Value::Array(graph)) = map.get("@graph") {
                push_item_emails(graph, out);
            }
        }
        Value::Array(items) => push_item_emails(items, out),
        _ => {}
    }
}

fn push_item_emails(items: &[Value], out: &mut Vec<String>) {
    for item in items {
        if let Value::Object(map) = item
            && let Some(email) = map.get("email")
        {
            push_email_value(email, out);
        }
    }
}

fn push_email_value(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(strip_mailto(s).to_string()),
        Value::Array(values) => {
            for v in values {
                if let Value::String(s) = v {
                    out.push(strip_mailto(s).to_string());
                }
            }
        }
        _ => {}
    }
}

fn strip_mailto(s: &str) -> &str {
    let s = s.trim();
    match s.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("mailto:") => &s[7..],
        _ => s,
    }
}

/// Text a visitor would see: text nodes outside script-like elements, joined by
/// single spaces.
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}
