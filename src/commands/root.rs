use anyhow::Result;
use colored::Colorize;

use super::{print_json, Format};
use crate::config::Config;
use crate::domain::device_service::DeviceService;

/// Exit status is 0 only when root is granted.
pub fn run(config: &Config, format: Format) -> Result<()> {
    let service = DeviceService::from_config(config);
    let root = service.privilege();
    let busybox = service.has_busybox();

    match format {
        Format::Json => print_json(&serde_json::json!({ "root": root, "busybox": busybox }))?,
        Format::Table => {
            if root.is_granted() {
                println!("  root:     {}", "granted".green());
            } else {
                println!("  root:     {}", "denied".red());
                println!("  hint:     root the device and grant asrctl superuser access");
            }
            println!(
                "  busybox:  {}",
                if busybox { "installed".green() } else { "missing".yellow() }
            );
        }
    }

    std::process::exit(if root.is_granted() { 0 } else { 1 });
}
