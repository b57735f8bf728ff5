// Region list loading

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Regions crawled when none are given.
pub const DEFAULT_REGIONS: &[&str] = &[
    "Međimurska",
    "Varaždinska",
    "Koprivničko-Križevačka",
    "Krapinsko-Zagorska",
];

pub fn default_regions() -> Vec<String> {
    DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
}

/// One region per line; blank lines are skipped.
pub fn parse_region_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_regions_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read regions file {}", path.display()))?;
    Ok(parse_region_lines(&content))
}

/// Explicit regions win over a regions file, which wins over the defaults.
pub fn resolve_regions(explicit: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let explicit: Vec<String> = explicit
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if !explicit.is_empty() {
        return Ok(explicit);
    }
    match file {
        Some(path) => load_regions_file(path),
        None => Ok(default_regions()),
    }
}
