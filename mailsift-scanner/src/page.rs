use crate::error::{Result, ScanError};
use crate::extractor::{ContactCandidate, ContactExtractor, EMAIL_IN_TEXT, visible_text};
use crate::policy::contains_opt_out;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

const MAX_FIELD_CHARS: usize = 200;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector is valid"));
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("og:title selector is valid")
});
static OG_SITE_NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:site_name"]"#).expect("og:site_name selector is valid")
});
static H1: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("h1 selector is valid"));
static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Page-level facts the filter and the records need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSignals {
    pub title: String,
    pub text: String,
    pub opt_out: bool,
    pub display_name: String,
    /// The organization keyword appears as a word in the title, or in the text
    /// outside of email addresses.
    pub mentions_org: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct PageAnalysis {
    pub signals: PageSignals,
    pub candidates: Vec<ContactCandidate>,
    pub links: Vec<PageLink>,
}

/// Parses a page once and returns everything the crawler needs as owned data.
pub struct PageAnalyzer {
    extractor: ContactExtractor,
    org_word: Regex,
    org_name: Regex,
}

impl PageAnalyzer {
    pub fn new(org_keyword: &str) -> Result<Self> {
        let keyword = regex::escape(org_keyword.trim());
        let org_word = Regex::new(&format!(r"(?i)\b{}\b", keyword))
            .map_err(|e| ScanError::Config(format!("bad organization keyword: {}", e)))?;
        let org_name = Regex::new(&format!(r"(?i)\b{}\s+[^|\-–—]+", keyword))
            .map_err(|e| ScanError::Config(format!("bad organization keyword: {}", e)))?;

        Ok(Self {
            extractor: ContactExtractor::new(),
            org_word,
            org_name,
        })
    }

    pub fn analyze(&self, html: &str, url: &str) -> PageAnalysis {
        let document = Html::parse_document(html);
        let text = visible_text(&document);
        let title = page_title(&document);

        let candidates = self.extractor.extract_parsed(&document, &text, url);
        let display_name = self.guess_name(&document, &title);
        let mentions_org = self.org_word.is_match(&title)
            || self.org_word.is_match(&EMAIL_IN_TEXT.replace_all(&text, " "));
        let opt_out = contains_opt_out(&text);

        let links = document
            .select(&ANCHORS)
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                Some(PageLink {
                    href: href.to_string(),
                    text: collapsed_text(a),
                })
            })
            .collect();

        PageAnalysis {
            signals: PageSignals {
                title,
                text,
                opt_out,
                display_name,
                mentions_org,
            },
            candidates,
            links,
        }
    }

    /// Best guess at the organization's name: a keyword phrase in the title, an
    /// `<h1>` naming the keyword, or the site name.
    fn guess_name(&self, document: &Html, title: &str) -> String {
        if let Some(m) = self.org_name.find(title) {
            return m.as_str().trim().to_string();
        }

        for h1 in document.select(&H1) {
            let text = collapsed_text(h1);
            if self.org_word.is_match(&text) {
                return truncate(&text);
            }
        }

        meta_content(document, &OG_SITE_NAME).unwrap_or_default()
    }
}

fn page_title(document: &Html) -> String {
    let title = document
        .select(&TITLE)
        .next()
        .map(collapsed_text)
        .unwrap_or_default();
    if !title.is_empty() {
        return truncate(&title);
    }
    meta_content(document, &OG_TITLE).unwrap_or_default()
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(truncate)
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_FIELD_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(html: &str) -> PageAnalysis {
        PageAnalyzer::new("opg")
            .unwrap()
            .analyze(html, "https://opg-juric.hr/")
    }

    #[test]
    fn test_title_and_name_from_title() {
        let page = analyze(
            "<html><head><title> OPG Jurić – Kontakt </title></head><body><h1>Dobrodošli</h1></body></html>",
        );
        assert_eq!(page.signals.title, "OPG Jurić – Kontakt");
        assert_eq!(page.signals.display_name, "OPG Jurić");
        assert!(page.signals.mentions_org);
    }

    #[test]
    fn test_title_falls_back_to_og_title() {
        let page = analyze(
            r#"<html><head><meta property="og:title" content="Domaći med"></head><body></body></html>"#,
        );
        assert_eq!(page.signals.title, "Domaći med");
    }

    #[test]
    fn test_name_from_h1_then_site_name() {
        let page = analyze(
            "<html><head><title>Naslovnica</title></head><body><h1>Vina OPG Horvat</h1></body></html>",
        );
        assert_eq!(page.signals.display_name, "Vina OPG Horvat");

        let page = analyze(
            r#"<html><head><title>Naslovnica</title><meta property="og:site_name" content="Med Kovač"></head>
               <body><h1>Dobrodošli</h1></body></html>"#,
        );
        assert_eq!(page.signals.display_name, "Med Kovač");

        let page = analyze("<html><head><title>Naslovnica</title></head><body></body></html>");
        assert_eq!(page.signals.display_name, "");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let page = analyze("<p>no head at all</p>");
        assert_eq!(page.signals.title, "");
        assert_eq!(page.signals.display_name, "");
    }

    #[test]
    fn test_org_keyword_inside_email_does_not_count() {
        let page = analyze(
            "<html><head><title>Naslovnica</title></head><body>Pišite: opg.juric@example.hr</body></html>",
        );
        assert!(!page.signals.mentions_org);

        let page = analyze("<html><body>Naše OPG gospodarstvo</body></html>");
        assert!(page.signals.mentions_org);
    }

    #[test]
    fn test_opt_out_detected_in_text() {
        let page = analyze("<html><body><footer>Zaštita podataka</footer></body></html>");
        assert!(page.signals.opt_out);
    }

    #[test]
    fn test_links_keep_href_and_text() {
        let page = analyze(
            r#"<a href="/kontakt"> Kontakt  nas </a><a href="">empty</a><a href="https://x.hr/">X</a>"#,
        );
        assert_eq!(
            page.links,
            vec![
                PageLink {
                    href: "/kontakt".to_string(),
                    text: "Kontakt nas".to_string()
                },
                PageLink {
                    href: "https://x.hr/".to_string(),
                    text: "X".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_keyword_is_escaped() {
        assert!(PageAnalyzer::new("d.o.o.").is_ok());
    }
}
