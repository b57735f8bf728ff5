// Run output: contacts CSV, audit JSON and a text summary

use crate::crawl::RunOutcome;
use anyhow::{Context, Result};
use mailsift_scanner::{AuditEntry, ContactRecord, DiscoveryMethod};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &[&str] = &[
    "email",
    "name",
    "region",
    "source_url",
    "page_title",
    "discovery_method",
    "discovered_at",
];

#[derive(Serialize)]
struct AuditDocument<'a> {
    pages: &'a [AuditEntry],
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Write records as CSV. The header is written even when there are no records.
pub fn write_contacts_csv(path: &Path, records: &[ContactRecord]) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// The audit file sits next to the CSV: same stem, `.json` extension.
pub fn audit_path_for(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("json")
}

pub fn write_audit_json(path: &Path, pages: &[AuditEntry]) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &AuditDocument { pages })?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write the CSV and its audit file. Returns the audit path.
pub fn save_run(csv_path: &Path, outcome: &RunOutcome) -> Result<PathBuf> {
    write_contacts_csv(csv_path, &outcome.records)?;
    let audit_path = audit_path_for(csv_path);
    write_audit_json(&audit_path, &outcome.audit)?;
    Ok(audit_path)
}

pub fn generate_run_summary(outcome: &RunOutcome) -> String {
    let rule = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
    let mut report = String::new();

    report.push_str(rule);
    report.push_str("# Summary:\n");
    if outcome.dry_run {
        report.push_str("  Dry run: no pages were fetched\n");
    }
    if outcome.cancelled {
        report.push_str("  Run interrupted: results are partial\n");
    }
    report.push_str(&format!("  Regions: {}\n", outcome.regions.len()));
    report.push_str(&format!(
        "  Seeds discovered: {}\n",
        outcome.regions.iter().map(|r| r.seeds).sum::<usize>()
    ));
    report.push_str(&format!(
        "  Pages visited: {}\n",
        outcome.regions.iter().map(|r| r.pages_visited).sum::<usize>()
    ));
    report.push_str(&format!("  Unique emails: {}\n", outcome.records.len()));
    report.push('\n');
    report.push_str(rule);
    report.push('\n');

    for region in &outcome.regions {
        report.push_str(&format!("## {}\n", region.region));
        report.push_str(&format!(
            "  {} seeds, {} pages, {} emails\n\n",
            region.seeds, region.pages_visited, region.records
        ));
    }

    if !outcome.records.is_empty() {
        let mut by_method: BTreeMap<&'static str, usize> = BTreeMap::new();
        for record in &outcome.records {
            *by_method.entry(record.discovery_method.as_str()).or_default() += 1;
        }
        report.push_str("## By discovery method\n");
        for method in [DiscoveryMethod::Mailto, DiscoveryMethod::JsonLd, DiscoveryMethod::Regex] {
            if let Some(count) = by_method.get(method.as_str()) {
                report.push_str(&format!("  {:<8} {}\n", method.as_str(), count));
            }
        }
        report.push('\n');
    }

    report
}
