use crate::canon::CanonicalUrl;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Substrings in a link's href or text that suggest a contact page.
pub const CONTACT_LINK_KEYWORDS: &[&str] = &[
    "kontakt", "contact", "email", "onama", "o-nama", "about", "opg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontierOrigin {
    #[serde(rename = "search_seed")]
    Seed,
    InternalLink,
    InternalContactLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: CanonicalUrl,
    pub depth: usize,
    pub origin: FrontierOrigin,
}

pub fn looks_like_contact_link(href: &str, text: &str) -> bool {
    let href = href.to_lowercase();
    let text = text.to_lowercase();
    CONTACT_LINK_KEYWORDS
        .iter()
        .any(|k| href.contains(k) || text.contains(k))
}

/// Two-level queue: likely contact pages jump the line, everything else waits its
/// turn at the back.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: CanonicalUrl) -> Self {
        let mut frontier = Self::new();
        frontier.push(FrontierEntry {
            url: seed,
            depth: 0,
            origin: FrontierOrigin::Seed,
        });
        frontier
    }

    pub fn push(&mut self, entry: FrontierEntry) {
        match entry.origin {
            FrontierOrigin::InternalContactLink => self.queue.push_front(entry),
            FrontierOrigin::Seed | FrontierOrigin::InternalLink => self.queue.push_back(entry),
        }
    }

    /// Queue a discovered link, classifying it by its href and anchor text.
    pub fn push_link(&mut self, url: CanonicalUrl, depth: usize, href: &str, text: &str) {
        let origin = if looks_like_contact_link(href, text) {
            FrontierOrigin::InternalContactLink
        } else {
            FrontierOrigin::InternalLink
        };
        self.push(FrontierEntry { url, depth, origin });
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::canonicalize;

    fn url(path: &str) -> CanonicalUrl {
        canonicalize(&format!("https://opg.hr{}", path)).unwrap()
    }

    #[test]
    fn test_contact_links_jump_the_queue() {
        let mut frontier = Frontier::with_seed(url("/"));
        assert_eq!(frontier.pop().unwrap().origin, FrontierOrigin::Seed);

        frontier.push_link(url("/proizvodi"), 1, "/proizvodi", "Proizvodi");
        frontier.push_link(url("/galerija"), 1, "/galerija", "Galerija");
        frontier.push_link(url("/kontakt"), 1, "/kontakt", "Kontakt");
        frontier.push_link(url("/p?id=7"), 1, "/p?id=7", "O nama / About");

        let order: Vec<String> = std::iter::from_fn(|| frontier.pop())
            .map(|e| e.url.as_url().path().to_string())
            .collect();
        assert_eq!(order, vec!["/p", "/kontakt", "/proizvodi", "/galerija"]);
    }

    #[test]
    fn test_looks_like_contact_link() {
        assert!(looks_like_contact_link("/O-Nama", ""));
        assert!(looks_like_contact_link("/page/3", "Contact us"));
        assert!(!looks_like_contact_link("/proizvodi", "Proizvodi"));
    }

    #[test]
    fn test_origin_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&FrontierOrigin::Seed).unwrap(),
            "\"search_seed\""
        );
        assert_eq!(
            serde_json::to_string(&FrontierOrigin::InternalContactLink).unwrap(),
            "\"internal_contact_link\""
        );
    }
}
