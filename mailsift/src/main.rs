use colored::Colorize;
use commands::command_argument_builder;
use mailsift::handlers::{handle_crawl, handle_run};
use mailsift_core::print_banner;
use tokio_util::sync::CancellationToken;
use tracing::warn;

mod commands;

/// Exit status after Ctrl-C, following the shell convention of 128 + SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current requests");
            interrupt.cancel();
        }
    });

    let result = match chosen_command.subcommand() {
        Some(("run", primary_command)) => handle_run(primary_command, cancel).await,
        Some(("crawl", primary_command)) => handle_crawl(primary_command, cancel).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    match result {
        Ok(outcome) if outcome.cancelled => std::process::exit(EXIT_INTERRUPTED),
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
