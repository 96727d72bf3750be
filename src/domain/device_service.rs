//! Device service: the entry point callers use for everything the core offers.
//!
//! All methods block. Async callers go through `dispatch::offload`.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::download::{Acquired, FileAcquirer, HttpAcquirer};
use crate::logs::{LogCollector, LogSource};
use crate::manifest::{ManifestFetcher, UpdateRecord};
use crate::probe::{Launcher, PrivilegeProbe, PrivilegeState, SystemLauncher};
use crate::properties::{PropertyMap, PropertyStore};
use crate::shell::{ElevatedShell, ShellResult, SuShell};

use super::types::*;

pub struct DeviceService {
    probe: PrivilegeProbe<Box<dyn Launcher>>,
    properties: PropertyStore,
    logs: LogCollector<Box<dyn ElevatedShell>>,
    manifest: ManifestFetcher,
    acquirer: Box<dyn FileAcquirer>,
    fetch_timeout: Option<Duration>,
    start_time: Instant,
}

impl DeviceService {
    pub fn from_config(config: &Config) -> Self {
        let probe = PrivilegeProbe::new(
            Box::new(SystemLauncher) as Box<dyn Launcher>,
            config.su_binary.clone(),
            config.su_paths.clone(),
            config.busybox.clone(),
            config.probe_timeout(),
        );
        let logs = LogCollector::new(
            Box::new(SuShell::new(&config.su_binary)) as Box<dyn ElevatedShell>,
            config.log_lines,
            config.shell_timeout(),
        );

        Self::new(
            probe,
            PropertyStore::new(config.getprop.clone()),
            logs,
            ManifestFetcher::new(config.manifest_url.clone()),
            Box::new(HttpAcquirer::new(
                config.download_dir.clone(),
                config.fetch_timeout(),
            )),
            config.fetch_timeout(),
        )
    }

    pub fn new(
        probe: PrivilegeProbe<Box<dyn Launcher>>,
        properties: PropertyStore,
        logs: LogCollector<Box<dyn ElevatedShell>>,
        manifest: ManifestFetcher,
        acquirer: Box<dyn FileAcquirer>,
        fetch_timeout: Option<Duration>,
    ) -> Self {
        Self {
            probe,
            properties,
            logs,
            manifest,
            acquirer,
            fetch_timeout,
            start_time: Instant::now(),
        }
    }

    pub fn properties(&self) -> PropertyMap {
        self.properties.load()
    }

    pub fn privilege(&self) -> PrivilegeState {
        self.probe.probe()
    }

    pub fn has_busybox(&self) -> bool {
        self.probe.has_busybox()
    }

    pub fn summary(&self) -> DeviceSummary {
        self.summary_from(&self.properties())
    }

    /// Summary over an already loaded property map.
    pub fn summary_from(&self, props: &PropertyMap) -> DeviceSummary {
        let root = self.privilege();
        let busybox = self.has_busybox();

        DeviceSummary {
            rom: props.get_or("ro.build.display.id", UNKNOWN).to_string(),
            root,
            busybox,
            repack: RepackDetails {
                version: props.get_or("ro.repack.version", NOT_AVAILABLE).to_string(),
                author: props.get_or("ro.repack.author", NOT_AVAILABLE).to_string(),
                filesystem: props.get_or("ro.repack.fs", NOT_AVAILABLE).to_string(),
                gsi_type: props.get_or("ro.repack.gsi", NOT_AVAILABLE).to_string(),
            },
            property_count: props.len(),
        }
    }

    pub fn log(&self, source: LogSource) -> ShellResult {
        match source {
            LogSource::System => self.logs.system_log(),
            LogSource::Kernel => self.logs.kernel_log(),
        }
    }

    pub fn log_capture(&self, source: LogSource) -> Result<LogCapture, crate::shell::ShellError> {
        let text = self.log(source)?;
        Ok(LogCapture {
            source,
            command: self.logs.command(source),
            text,
        })
    }

    /// Add-on updates. The manifest is only consulted on rooted devices
    /// unless `skip_root_check` is set.
    pub fn updates(&self, skip_root_check: bool) -> UpdatesReport {
        let root = self.privilege();
        if !skip_root_check && !root.is_granted() {
            info!("root unavailable, skipping update manifest");
            return UpdatesReport {
                root,
                gated: true,
                records: Vec::new(),
            };
        }

        UpdatesReport {
            root,
            gated: false,
            records: self.manifest.fetch(self.fetch_timeout),
        }
    }

    /// First manifest record with a download link.
    pub fn latest_release(&self) -> Option<UpdateRecord> {
        self.manifest
            .fetch(self.fetch_timeout)
            .into_iter()
            .find(|r| !r.download_link.is_empty())
    }

    pub fn acquire(&self, url: &str, title: &str) -> Result<Acquired> {
        self.acquirer
            .acquire(url, title)
            .with_context(|| format!("downloading {}", title))
    }

    pub fn health(&self) -> DaemonHealth {
        DaemonHealth {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logs::tests::ScriptedShell;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FixedLauncher(bool);

    impl Launcher for FixedLauncher {
        fn succeeds(
            &self,
            _program: &str,
            _args: &[&str],
            _deadline: Option<Duration>,
        ) -> io::Result<bool> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingAcquirer {
        pub(crate) requests: Mutex<Vec<(String, String)>>,
    }

    impl FileAcquirer for RecordingAcquirer {
        fn acquire(&self, url: &str, title: &str) -> Result<Acquired> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), title.to_string()));
            Ok(Acquired {
                title: title.to_string(),
                path: PathBuf::from(format!("/tmp/{}.apk", title)),
                bytes: 0,
                checksum: "sha256:".to_string(),
            })
        }
    }

    /// A service with a fake root check and shell, an absent `getprop` and an
    /// unreachable manifest URL.
    pub(crate) fn fake_service(
        su_path: Option<PathBuf>,
        root_works: bool,
        fail_on: Option<&'static str>,
    ) -> DeviceService {
        let probe = PrivilegeProbe::new(
            Box::new(FixedLauncher(root_works)) as Box<dyn Launcher>,
            "su",
            su_path.into_iter().collect(),
            "busybox",
            None,
        );
        let logs = LogCollector::new(
            Box::new(ScriptedShell::new(fail_on)) as Box<dyn ElevatedShell>,
            500,
            None,
        );
        DeviceService::new(
            probe,
            PropertyStore::new("/nonexistent/getprop"),
            logs,
            ManifestFetcher::new("http://127.0.0.1:1/stable.json"),
            Box::new(RecordingAcquirer::default()),
            Some(Duration::from_secs(2)),
        )
    }

    #[test]
    fn summary_defaults_when_properties_unavailable() {
        let summary = fake_service(None, true, None).summary();
        assert_eq!(summary.rom, UNKNOWN);
        assert_eq!(summary.repack.author, NOT_AVAILABLE);
        assert_eq!(summary.root, PrivilegeState::Denied);
        assert!(summary.busybox);
        assert_eq!(summary.property_count, 0);
    }

    #[test]
    fn summary_counts_the_given_map() {
        let props = crate::properties::parse(
            "[ro.build.display.id]: [ASR-1.0]\n[ro.repack.author]: [asr]\n",
        );
        let summary = fake_service(None, false, None).summary_from(&props);
        assert_eq!(summary.rom, "ASR-1.0");
        assert_eq!(summary.repack.author, "asr");
        assert_eq!(summary.repack.version, NOT_AVAILABLE);
        assert_eq!(summary.property_count, props.len());
    }

    #[test]
    fn updates_are_gated_on_root() {
        let report = fake_service(None, true, None).updates(false);
        assert!(report.gated);
        assert!(report.records.is_empty());
        assert_eq!(report.root, PrivilegeState::Denied);
    }

    #[test]
    fn unreachable_manifest_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let su = dir.path().join("su");
        std::fs::write(&su, "").unwrap();

        let report = fake_service(Some(su), true, None).updates(false);
        assert_eq!(report.root, PrivilegeState::Granted);
        assert!(!report.gated);
        assert!(report.records.is_empty());
    }

    #[test]
    fn log_capture_carries_command_and_failure() {
        let service = fake_service(None, false, Some("dmesg"));
        let capture = service.log_capture(LogSource::System).unwrap();
        assert_eq!(capture.command, "logcat -d -t 500 -v threadtime");
        assert!(service.log_capture(LogSource::Kernel).is_err());
    }

    #[test]
    fn acquire_delegates_to_collaborator() {
        let acquired = fake_service(None, false, None)
            .acquire("https://x/magisk.apk", "Magisk Stable")
            .unwrap();
        assert_eq!(acquired.title, "Magisk Stable");
    }
}
