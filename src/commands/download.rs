use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::domain::device_service::DeviceService;

pub fn run(
    config: &Config,
    url: Option<String>,
    title: Option<String>,
    latest: bool,
) -> Result<()> {
    let service = DeviceService::from_config(config);

    let (url, title) = if latest {
        let record = service
            .latest_release()
            .context("no release with a download link in the manifest")?;
        (record.download_link, record.title)
    } else {
        match (url, title) {
            (Some(url), Some(title)) => (url, title),
            _ => bail!("either --latest or both <URL> and <TITLE> are required"),
        }
    };

    println!("{} Downloading {}...", "::".blue().bold(), title);
    match service.acquire(&url, &title) {
        Ok(acquired) => {
            println!(
                "{} {} saved to {}",
                "ok".green().bold(),
                acquired.title,
                acquired.path.display()
            );
            println!("   {} bytes, {}", acquired.bytes, acquired.checksum);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} Download failed: {:#}", "!!".red().bold(), e);
            std::process::exit(1);
        }
    }
}
