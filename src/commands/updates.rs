//! `asrctl updates` — list add-on releases from the remote manifest.

use anyhow::Result;
use colored::Colorize;

use super::{print_json, Format};
use crate::config::Config;
use crate::domain::device_service::DeviceService;

pub fn run(config: &Config, format: Format, skip_root_check: bool) -> Result<()> {
    let report = DeviceService::from_config(config).updates(skip_root_check);

    if format == Format::Json {
        print_json(&report)?;
        if report.gated {
            std::process::exit(1);
        }
        return Ok(());
    }

    if report.gated {
        println!("{}", "Root Access Required".bold());
        println!("   This section is only for rooted devices.");
        println!("   Pass --skip-root-check to list releases anyway.");
        std::process::exit(1);
    }

    if report.records.is_empty() {
        println!(
            "{} No releases available (manifest unreachable or empty)",
            "!!".yellow().bold()
        );
        return Ok(());
    }

    for record in &report.records {
        println!("{}", record.title.bold());
        println!("  v{} ({})", record.version, record.version_code);
        if !record.download_link.is_empty() {
            println!("  link:      {}", record.download_link);
        }
        if !record.note.is_empty() {
            println!("  changelog: {}", record.note);
        }
    }
    println!();
    println!(
        "{} Fetch one with `asrctl download <link> <title>` or `asrctl download --latest`",
        "::".blue().bold()
    );

    Ok(())
}
