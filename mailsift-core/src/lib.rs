pub mod crawl;
pub mod discovery;
pub mod regions;
pub mod report;

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
                _ _     _  __ _
  _ __ ___   __ _(_) |___(_)/ _| |_
 | '_ ` _ \ / _` | | / __| | |_| __|
 | | | | | | (_| | | \__ \ |  _| |_
 |_| |_| |_|\__,_|_|_|___/_|_|  \__|
"#;
    println!("{}", banner.bright_green());
    println!(
        "  {} {}\n",
        "contact email discovery for family farms".dimmed(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
