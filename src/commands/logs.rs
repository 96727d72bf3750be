//! `asrctl logs <system|kernel>` — dump a log buffer through the root shell.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use super::{print_json, Format};
use crate::config::Config;
use crate::domain::device_service::DeviceService;
use crate::logs::LogSource;
use crate::shell::render_in_band;

pub fn run(
    config: &Config,
    source: LogSource,
    format: Format,
    output: Option<PathBuf>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(secs) = timeout_secs {
        config.shell_timeout_secs = secs;
    }

    let service = DeviceService::from_config(&config);
    let capture = match service.log_capture(source) {
        Ok(capture) => capture,
        Err(e) => {
            eprintln!("{} could not read the {} log", "!!".red().bold(), source);
            eprintln!("{}", render_in_band(&Err(e)));
            std::process::exit(1);
        }
    };

    if let Some(path) = output {
        let path = resolve_output(&path, source);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&path, &capture.text)
            .with_context(|| format!("writing {}", path.display()))?;
        println!(
            "{} {} log saved to {} ({} lines)",
            "ok".green().bold(),
            source,
            path.display(),
            capture.text.lines().count()
        );
        return Ok(());
    }

    match format {
        Format::Json => print_json(&capture),
        Format::Table => {
            print!("{}", capture.text);
            Ok(())
        }
    }
}

/// A directory target gets a timestamped file name.
fn resolve_output(path: &Path, source: LogSource) -> PathBuf {
    if path.is_dir() {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        path.join(format!("{}-{}.log", source, stamp))
    } else {
        path.to_path_buf()
    }
}
