use clap::{Arg, ArgAction, Command, value_parser};
use mailsift::handlers::*;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use url::Url;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://opg-juric.hr");
    assert_eq!(result, Some("https://opg-juric.hr/".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("opg-juric.hr/kontakt");
    assert_eq!(result, Some("http://opg-juric.hr/kontakt".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
    assert_eq!(parse_url_line("ftp://files.example.com/"), None);
}

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://opg-juric.hr")?;
    writeln!(temp_file, "# farms from the fair")?;
    writeln!(temp_file, "opg-horvat.hr")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "https://med-kovac.hr/kontakt#form")?;

    let urls = load_urls_from_file(temp_file.path())?;

    assert_eq!(
        urls,
        vec![
            "https://opg-juric.hr/",
            "http://opg-horvat.hr/",
            "https://med-kovac.hr/kontakt"
        ]
    );

    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let result = load_urls_from_file(temp_file.path());

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("No valid URLs"));
}

#[test]
fn test_load_urls_from_file_missing() {
    let result = load_urls_from_file(std::path::Path::new("/nonexistent/hosts.txt"));
    assert!(result.unwrap_err().to_string().contains("Failed to read hosts file"));
}

#[test]
fn test_load_urls_from_source_single_url() {
    let url = Url::parse("https://opg-juric.hr").unwrap();
    let result = load_urls_from_source(Some(&url), None).unwrap();

    assert_eq!(result, vec!["https://opg-juric.hr/"]);
}

#[test]
fn test_load_urls_from_source_no_input() {
    let result = load_urls_from_source(None, None);
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Either --url or --hosts-file must be provided")
    );
}

#[test]
fn test_expand_path_tilde() {
    let expanded = expand_path("~/opg_emails.csv");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("opg_emails.csv"));
    assert_eq!(expand_path("out/emails.csv"), std::path::PathBuf::from("out/emails.csv"));
}

fn crawl_command() -> Command {
    Command::new("test")
        .arg(Arg::new("depth").long("depth").value_parser(value_parser!(usize)).default_value("2"))
        .arg(Arg::new("timeout").long("timeout").value_parser(value_parser!(u64)).default_value("20"))
        .arg(Arg::new("delay").long("delay").value_parser(value_parser!(f64)).default_value("1.0"))
        .arg(Arg::new("dry-run").long("dry-run").action(ArgAction::SetTrue))
        .arg(Arg::new("respect-opt-out").long("respect-opt-out").action(ArgAction::SetTrue))
        .arg(Arg::new("include-role-emails").long("include-role-emails").action(ArgAction::SetTrue))
}

#[test]
fn test_build_config_maps_flags() {
    let matches = crawl_command()
        .try_get_matches_from([
            "test",
            "--depth",
            "1",
            "--timeout",
            "5",
            "--delay",
            "0.5",
            "--dry-run",
            "--include-role-emails",
        ])
        .unwrap();

    let config = build_config(&matches).unwrap();

    assert_eq!(config.max_depth, 1);
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.delay, Duration::from_millis(500));
    assert!(config.dry_run);
    assert!(config.include_role_emails);
    assert!(!config.respect_opt_out);
}

#[test]
fn test_build_config_rejects_negative_delay() {
    let matches = crawl_command()
        .try_get_matches_from(["test", "--delay=-1"])
        .unwrap();
    assert!(build_config(&matches).is_err());
}
