use anyhow::Result;

use crate::config::Config;

pub fn run(config: &Config, http_addr: Option<String>, log_level: Option<String>) -> Result<()> {
    let mut config = config.clone();

    // CLI flags override config values
    if let Some(addr) = http_addr {
        config.http_addr = addr;
    }
    if let Some(level) = log_level {
        config.log_level = level;
    }

    // Build tokio runtime explicitly (no #[tokio::main] on fn main)
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(crate::server::run(config))
}
