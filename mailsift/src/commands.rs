use crate::CLAP_STYLING;
use clap::{Arg, arg, command};
use url::Url;

/// Options shared by every subcommand that fetches pages.
fn crawl_args() -> Vec<Arg> {
    vec![
        arg!(--"depth" <DEPTH>)
            .required(false)
            .help("Maximum depth of internal links to follow from a seed")
            .value_parser(clap::value_parser!(usize))
            .default_value("2"),
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Output CSV path; the audit JSON is written next to it")
            .default_value("opg_emails.csv"),
        arg!(--"dry-run")
            .required(false)
            .help("Do not fetch any page, only log the planned requests")
            .action(clap::ArgAction::SetTrue),
        arg!(--"respect-opt-out")
            .required(false)
            .help("Drop addresses found on pages that ask not to be contacted")
            .action(clap::ArgAction::SetTrue),
        arg!(--"include-role-emails")
            .required(false)
            .help("Keep role addresses such as info@ even without an OPG context")
            .action(clap::ArgAction::SetTrue),
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("HTTP request timeout in seconds")
            .value_parser(clap::value_parser!(u64).range(1..))
            .default_value("20"),
        arg!(--"delay" <SECONDS>)
            .required(false)
            .help("Minimum delay between two requests to the same host")
            .value_parser(clap::value_parser!(f64))
            .default_value("1.0"),
        arg!(-c --"concurrency" <HOSTS>)
            .required(false)
            .help("Number of hosts crawled at the same time")
            .value_parser(clap::value_parser!(usize))
            .default_value("2"),
        arg!(--"log-file" <PATH>)
            .required(false)
            .help("Also write the log to this file"),
        arg!(-v --"verbose")
            .required(false)
            .help("Log at debug level")
            .action(clap::ArgAction::SetTrue),
        arg!(--"no-progress")
            .required(false)
            .help("Disable the progress spinner")
            .action(clap::ArgAction::SetTrue),
    ]
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("mailsift")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("mailsift")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("run")
                .about(
                    "Discover OPG websites for each region through web search, crawl them and \
                collect their public contact addresses.",
                )
                .arg(
                    arg!([REGIONS] ...)
                        .required(false)
                        .help("Regions to search, e.g. Međimurska Varaždinska"),
                )
                .arg(
                    arg!(--"regions-file" <PATH>)
                        .required(false)
                        .help("Path to a file with one region per line")
                        .conflicts_with("REGIONS"),
                )
                .arg(
                    arg!(--"max-results-per-region" <N>)
                        .required(false)
                        .help("Maximum number of search results used as seeds per region")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("50"),
                )
                .arg(
                    arg!(--"max-pages-per-region" <N>)
                        .required(false)
                        .help("Page budget per region, shared across its hosts")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("200"),
                )
                .args(crawl_args()),
        )
        .subcommand(
            command!("crawl")
                .about("Crawl known sites directly, without search-based discovery.")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The URL to crawl")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to crawl")
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-r --"region" <REGION>)
                        .required(false)
                        .help("Region recorded for every address found")
                        .default_value("unknown"),
                )
                .arg(
                    arg!(--"max-pages" <N>)
                        .required(false)
                        .help("Maximum number of pages crawled per URL")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("50"),
                )
                .args(crawl_args()),
        )
}
