use crate::config::CrawlConfig;
use crate::extractor::{ContactCandidate, DiscoveryMethod};
use crate::page::PageSignals;

/// Local parts that address a role rather than a person.
pub const ROLE_BASED_PREFIXES: &[&str] = &[
    "info@",
    "contact@",
    "kontakt@",
    "webmaster@",
    "postmaster@",
    "admin@",
    "office@",
];

/// Phrases (English and Croatian) signalling that a site owner does not want to be
/// contacted or marketed to.
pub const OPT_OUT_KEYWORDS: &[&str] = &[
    "no spam",
    "do not contact",
    "do-not-contact",
    "do-not-email",
    "dont contact",
    "do not email",
    "do-not-mail",
    "no marketing",
    "opt-out",
    "unsubscribe",
    "privacy policy",
    "ne šaljite spam",
    "ne šaljite neželjenu poštu",
    "neželjena pošta",
    "ne zelimo spam",
    "ne želimo spam",
    "bez marketinga",
    "ne kontaktirajte",
    "ne-kontaktirajte",
    "odjava",
    "privatnost",
    "zaštita podataka",
];

pub fn is_role_based(email: &str) -> bool {
    let email = email.to_lowercase();
    ROLE_BASED_PREFIXES.iter().any(|p| email.starts_with(p))
}

pub fn contains_opt_out(text: &str) -> bool {
    let text = text.to_lowercase();
    OPT_OUT_KEYWORDS.iter().any(|k| text.contains(k))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    RoleBased,
    OptedOut,
}

/// Decides whether an extracted address becomes a record.
#[derive(Debug, Clone)]
pub struct ContactFilter {
    include_role_emails: bool,
    respect_opt_out: bool,
    org_keyword: String,
}

impl ContactFilter {
    pub fn new(include_role_emails: bool, respect_opt_out: bool, org_keyword: &str) -> Self {
        Self {
            include_role_emails,
            respect_opt_out,
            org_keyword: org_keyword.trim().to_lowercase(),
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(
            config.include_role_emails,
            config.respect_opt_out,
            &config.org_keyword,
        )
    }

    pub fn evaluate(&self, candidate: &ContactCandidate, page: &PageSignals) -> Verdict {
        // A role address is the organization's own when the page names it, or when
        // the page links it on a domain that does.
        if !self.include_role_emails
            && is_role_based(&candidate.email)
            && !page.mentions_org
            && !(candidate.method == DiscoveryMethod::Mailto
                && self.domain_names_org(&candidate.email))
        {
            return Verdict::RoleBased;
        }
        if self.respect_opt_out && page.opt_out {
            return Verdict::OptedOut;
        }
        Verdict::Accept
    }

    fn domain_names_org(&self, email: &str) -> bool {
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        !self.org_keyword.is_empty()
            && domain
                .split(['.', '-'])
                .any(|label| label.eq_ignore_ascii_case(&self.org_keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageAnalyzer;

    fn text(email: &str) -> ContactCandidate {
        ContactCandidate {
            email: email.to_string(),
            method: DiscoveryMethod::Regex,
        }
    }

    fn mailto(email: &str) -> ContactCandidate {
        ContactCandidate {
            email: email.to_string(),
            method: DiscoveryMethod::Mailto,
        }
    }

    fn signals(html: &str) -> PageSignals {
        PageAnalyzer::new("opg")
            .unwrap()
            .analyze(html, "https://opg-test.hr/")
            .signals
    }

    #[test]
    fn test_is_role_based() {
        assert!(is_role_based("info@opg-test.hr"));
        assert!(is_role_based("KONTAKT@farm.hr"));
        assert!(!is_role_based("ivana.info@farm.hr"));
        assert!(!is_role_based("prodaja@farm.hr"));
    }

    #[test]
    fn test_contains_opt_out() {
        assert!(contains_opt_out("Molimo, NE ŠALJITE SPAM na ovu adresu"));
        assert!(contains_opt_out("Read our Privacy Policy"));
        assert!(!contains_opt_out("Svježe povrće iz Međimurja"));
    }

    #[test]
    fn test_role_address_kept_on_org_page() {
        let filter = ContactFilter::new(false, false, "opg");
        let page = signals("<html><head><title>OPG Test</title></head><body>Dobrodošli</body></html>");
        assert_eq!(filter.evaluate(&text("info@opg-test.hr"), &page), Verdict::Accept);
    }

    #[test]
    fn test_role_address_dropped_on_generic_page() {
        let filter = ContactFilter::new(false, false, "opg");
        let page = signals(
            "<html><head><title>Generic Business</title></head><body>Pišite na info@opg-test.hr</body></html>",
        );
        assert_eq!(filter.evaluate(&text("info@opg-test.hr"), &page), Verdict::RoleBased);
    }

    #[test]
    fn test_linked_role_address_kept_on_org_domain() {
        let filter = ContactFilter::new(false, false, "opg");
        let page = signals("<html><head><title>Naslovnica</title></head><body>Pišite nam</body></html>");
        assert_eq!(filter.evaluate(&mailto("kontakt@opg-juric.hr"), &page), Verdict::Accept);
        assert_eq!(filter.evaluate(&text("kontakt@opg-juric.hr"), &page), Verdict::RoleBased);
        assert_eq!(filter.evaluate(&mailto("info@example.hr"), &page), Verdict::RoleBased);
        assert_eq!(filter.evaluate(&mailto("info@opgarden.hr"), &page), Verdict::RoleBased);
    }

    #[test]
    fn test_linked_role_address_on_generic_page() {
        let filter = ContactFilter::new(false, false, "opg");
        let page = PageAnalyzer::new("opg").unwrap().analyze(
            r#"<html><head><title>Generic Business</title></head>
               <body><a href="mailto:info@opg-test.hr">Pišite nam</a></body></html>"#,
            "https://opg-test.hr/",
        );
        assert!(!page.signals.mentions_org);
        let candidate = page
            .candidates
            .iter()
            .find(|c| c.email == "info@opg-test.hr")
            .unwrap();
        assert_eq!(candidate.method, DiscoveryMethod::Mailto);

        // Linked from a page on a domain naming the keyword: kept.
        assert_eq!(filter.evaluate(candidate, &page.signals), Verdict::Accept);
        // The same address only mentioned in text stays excluded.
        assert_eq!(
            filter.evaluate(&text("info@opg-test.hr"), &page.signals),
            Verdict::RoleBased
        );
    }

    #[test]
    fn test_role_address_kept_when_included() {
        let filter = ContactFilter::new(true, false, "opg");
        let page = signals("<html><head><title>Generic Business</title></head></html>");
        assert_eq!(filter.evaluate(&text("info@opg-test.hr"), &page), Verdict::Accept);
    }

    #[test]
    fn test_opt_out_only_when_respected() {
        let page = signals("<html><body>Do not contact us for marketing. ana@farm.hr</body></html>");
        assert!(page.opt_out);
        assert_eq!(
            ContactFilter::new(false, true, "opg").evaluate(&text("ana@farm.hr"), &page),
            Verdict::OptedOut
        );
        assert_eq!(
            ContactFilter::new(false, false, "opg").evaluate(&text("ana@farm.hr"), &page),
            Verdict::Accept
        );
    }
}
