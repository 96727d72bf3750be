//! `asrctl info` / `asrctl prop <key>` — build properties and root status.

use anyhow::Result;
use colored::Colorize;

use super::{print_json, Format};
use crate::config::Config;
use crate::domain::device_service::DeviceService;
use crate::probe::PrivilegeState;

pub fn run(config: &Config, format: Format, all: bool) -> Result<()> {
    let service = DeviceService::from_config(config);
    let props = service.properties();
    let summary = service.summary_from(&props);

    if format == Format::Json {
        if all {
            return print_json(&serde_json::json!({ "summary": summary, "properties": props }));
        }
        return print_json(&summary);
    }

    println!("{}", "Device Status".bold());
    println!("  ROM:          {}", summary.rom);
    let root = match summary.root {
        PrivilegeState::Granted => "Granted".green(),
        PrivilegeState::Denied => "Denied".red(),
    };
    println!("  Root Access:  {}", root);
    println!(
        "  BusyBox:      {}",
        if summary.busybox {
            "Installed".green()
        } else {
            "Missing".yellow()
        }
    );
    println!();
    println!("{}", "Repack Details".bold());
    println!("  Version:      {}", summary.repack.version);
    println!("  Author:       {}", summary.repack.author);
    println!("  File System:  {}", summary.repack.filesystem);
    println!("  GSI Type:     {}", summary.repack.gsi_type);

    if all {
        println!();
        println!(
            "{} {}",
            "Properties".bold(),
            format!("({})", summary.property_count).dimmed()
        );
        if props.is_empty() {
            println!("  {} property dump unavailable", "!!".yellow().bold());
        }
        for (key, value) in props.iter() {
            println!("  {} = {}", key.dimmed(), value);
        }
    }

    Ok(())
}

pub fn prop(config: &Config, key: &str) -> Result<()> {
    let props = DeviceService::from_config(config).properties();
    match props.get(key) {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => {
            eprintln!("{} property not set: {}", "!!".red().bold(), key);
            std::process::exit(1);
        }
    }
}
