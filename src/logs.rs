use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::bail;
use serde::Serialize;
use tracing::{info, warn};

use crate::shell::{ElevatedShell, ShellResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    System,
    Kernel,
}

impl FromStr for LogSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "system" | "android" | "logcat" => Ok(LogSource::System),
            "kernel" | "dmesg" => Ok(LogSource::Kernel),
            other => bail!("unknown log source '{}' (expected 'system' or 'kernel')", other),
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::System => write!(f, "system"),
            LogSource::Kernel => write!(f, "kernel"),
        }
    }
}

/// Fetches log buffers through the elevated shell. Each call is independent.
pub struct LogCollector<S> {
    shell: S,
    system_lines: u32,
    deadline: Option<Duration>,
}

impl<S: ElevatedShell> LogCollector<S> {
    pub fn new(shell: S, system_lines: u32, deadline: Option<Duration>) -> Self {
        Self {
            shell,
            system_lines,
            deadline,
        }
    }

    pub fn command(&self, source: LogSource) -> String {
        match source {
            LogSource::System => format!("logcat -d -t {} -v threadtime", self.system_lines),
            LogSource::Kernel => "dmesg".to_string(),
        }
    }

    pub fn collect(&self, source: LogSource) -> ShellResult {
        let command = self.command(source);
        let result = self.shell.execute(&command, self.deadline);
        match &result {
            Ok(text) => info!(%source, bytes = text.len(), "collected log"),
            Err(e) => warn!(%source, kind = ?e.kind(), error = %e, "log collection failed"),
        }
        result
    }

    pub fn system_log(&self) -> ShellResult {
        self.collect(LogSource::System)
    }

    pub fn kernel_log(&self) -> ShellResult {
        self.collect(LogSource::Kernel)
    }
}
