use crate::extractor::DiscoveryMethod;
use crate::frontier::FrontierOrigin;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One accepted contact address, ready for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub region: String,
    pub source_url: String,
    #[serde(default)]
    pub page_title: String,
    pub discovery_method: DiscoveryMethod,
    #[serde(with = "iso_seconds")]
    pub discovered_at: DateTime<Utc>,
}

/// Trace of one dequeued page, kept whether or not it yielded anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub url: String,
    pub title: String,
    pub region: String,
    #[serde(with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
    pub found_emails: Vec<String>,
    pub opt_out_detected: bool,
    pub source: FrontierOrigin,
    /// False when the page was skipped by robots.txt or could not be fetched.
    pub fetched: bool,
}

impl AuditEntry {
    pub fn unfetched(url: String, region: String, source: FrontierOrigin) -> Self {
        Self {
            url,
            title: String::new(),
            region,
            timestamp: now(),
            found_emails: Vec::new(),
            opt_out_detected: false,
            source,
            fetched: false,
        }
    }
}

/// Everything one host crawl produced.
#[derive(Debug, Clone, Default)]
pub struct HostCrawl {
    pub records: Vec<ContactRecord>,
    pub audit: Vec<AuditEntry>,
    pub pages_visited: usize,
    pub cancelled: bool,
}

impl HostCrawl {
    pub fn extend(&mut self, other: HostCrawl) {
        self.records.extend(other.records);
        self.audit.extend(other.audit);
        self.pages_visited += other.pages_visited;
        self.cancelled |= other.cancelled;
    }
}

/// Current UTC time truncated to whole seconds.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}

/// ISO-8601, second precision, explicit `+00:00` offset.
pub mod iso_seconds {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 9, 3, 7).unwrap();
        assert_eq!(iso_seconds::format(&ts), "2024-05-17T09:03:07+00:00");
    }

    #[test]
    fn test_now_has_no_subseconds() {
        assert_eq!(now().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_audit_entry_json_keys() {
        let entry = AuditEntry::unfetched(
            "https://opg.hr/".to_string(),
            "Međimurska".to_string(),
            FrontierOrigin::Seed,
        );
        let value = serde_json::to_value(&entry).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "fetched",
                "found_emails",
                "opt_out_detected",
                "region",
                "source",
                "timestamp",
                "title",
                "url"
            ]
        );
        assert_eq!(value["source"], "search_seed");
    }
}
