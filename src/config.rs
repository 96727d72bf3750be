use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Locations where an elevation binary is conventionally installed.
pub const DEFAULT_SU_PATHS: &[&str] = &[
    "/sbin/su",
    "/system/bin/su",
    "/system/xbin/su",
    "/data/local/xbin/su",
    "/data/local/bin/su",
    "/system/sd/xbin/su",
    "/system/bin/failsafe/su",
    "/data/local/su",
    "/su/bin/su",
];

pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/topjohnwu/magisk-files/refs/heads/master/stable.json";

const ENV_PREFIX: &str = "ASRCTL_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub su_binary: String,
    pub su_paths: Vec<PathBuf>,
    pub busybox: String,
    pub getprop: String,
    pub log_lines: u32,
    pub manifest_url: String,
    pub shell_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub download_dir: PathBuf,
    pub http_addr: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            su_binary: "su".to_string(),
            su_paths: DEFAULT_SU_PATHS.iter().map(PathBuf::from).collect(),
            busybox: "busybox".to_string(),
            getprop: "getprop".to_string(),
            log_lines: 500,
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            shell_timeout_secs: 30,
            probe_timeout_secs: 10,
            fetch_timeout_secs: 15,
            request_timeout_secs: 60,
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads")),
            http_addr: "127.0.0.1:9180".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("asrctl").join("config.yaml"))
    }

    /// Zero disables the deadline.
    pub fn shell_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.shell_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.probe_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.fetch_timeout_secs)
    }

    /// Upper bound the daemon puts on any one request's blocking work.
    pub fn request_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.request_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Load config from the default location (missing file is fine).
pub fn load() -> Result<Config> {
    let path = Config::path()?;
    load_from(&path)
}

/// Defaults, then the YAML file at `path` if present, then `ASRCTL_*` env vars.
pub fn load_from(path: &Path) -> Result<Config> {
    figment_for(path)
        .extract()
        .with_context(|| format!("loading config from {}", path.display()))
}

fn figment_for(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
}
