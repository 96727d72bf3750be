use serde::Serialize;

use crate::manifest::UpdateRecord;
use crate::probe::PrivilegeState;
use crate::shell::FailureKind;

/// Values for a property the build does not set.
pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub rom: String,
    pub root: PrivilegeState,
    pub busybox: bool,
    pub repack: RepackDetails,
    pub property_count: usize,
}

/// `ro.repack.*` properties stamped by the ROM repacker.
#[derive(Debug, Clone, Serialize)]
pub struct RepackDetails {
    pub version: String,
    pub author: String,
    pub filesystem: String,
    pub gsi_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatesReport {
    pub root: PrivilegeState,
    /// True when the manifest was not fetched because root is unavailable.
    pub gated: bool,
    pub records: Vec<UpdateRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogCapture {
    pub source: crate::logs::LogSource,
    pub command: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    pub version: String,
    pub uptime_secs: u64,
    pub hostname: String,
}

/// JSON body for failed requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Spawn,
    Io,
    Timeout,
    DispatchTimeout,
    Internal,
    NotFound,
}

impl From<FailureKind> for ErrorKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Spawn => ErrorKind::Spawn,
            FailureKind::Io => ErrorKind::Io,
            FailureKind::Timeout => ErrorKind::Timeout,
        }
    }
}
