//! Root availability checks.
//!
//! A probe never fails: every error collapses to `Denied` / `false`.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::shell::wait_with_deadline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrivilegeState {
    Granted,
    Denied,
}

impl PrivilegeState {
    pub fn is_granted(self) -> bool {
        matches!(self, PrivilegeState::Granted)
    }
}

impl fmt::Display for PrivilegeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivilegeState::Granted => write!(f, "Granted"),
            PrivilegeState::Denied => write!(f, "Denied"),
        }
    }
}

/// Runs a program to completion and reports whether it exited with status 0.
pub trait Launcher: Send + Sync {
    fn succeeds(&self, program: &str, args: &[&str], deadline: Option<Duration>)
        -> io::Result<bool>;
}

impl<T: Launcher + ?Sized> Launcher for Box<T> {
    fn succeeds(
        &self,
        program: &str,
        args: &[&str],
        deadline: Option<Duration>,
    ) -> io::Result<bool> {
        (**self).succeeds(program, args, deadline)
    }
}

/// Spawns real processes with all stdio discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn succeeds(
        &self,
        program: &str,
        args: &[&str],
        deadline: Option<Duration>,
    ) -> io::Result<bool> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        match wait_with_deadline(&mut child, deadline)? {
            Some(status) => Ok(status.success()),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{} did not exit in time", program),
                ))
            }
        }
    }
}

pub struct PrivilegeProbe<L = SystemLauncher> {
    launcher: L,
    su_binary: String,
    su_paths: Vec<PathBuf>,
    busybox: String,
    deadline: Option<Duration>,
}

impl<L: Launcher> PrivilegeProbe<L> {
    pub fn new(
        launcher: L,
        su_binary: impl Into<String>,
        su_paths: Vec<PathBuf>,
        busybox: impl Into<String>,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            launcher,
            su_binary: su_binary.into(),
            su_paths,
            busybox: busybox.into(),
            deadline,
        }
    }

    /// Granted iff some candidate path exists *and* `su -c id` exits 0.
    ///
    /// When no candidate exists nothing is spawned.
    pub fn probe(&self) -> PrivilegeState {
        let Some(found) = self.su_paths.iter().find(|p| p.exists()) else {
            debug!(candidates = self.su_paths.len(), "no su binary at any known path");
            return PrivilegeState::Denied;
        };
        debug!(path = %found.display(), "su binary present, checking it works");

        if self.run_check(&self.su_binary, &["-c", "id"]) {
            PrivilegeState::Granted
        } else {
            PrivilegeState::Denied
        }
    }

    pub fn has_busybox(&self) -> bool {
        self.run_check("which", &[self.busybox.as_str()])
    }

    fn run_check(&self, program: &str, args: &[&str]) -> bool {
        match self.launcher.succeeds(program, args, self.deadline) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(program, error = %e, "privilege check could not run");
                false
            }
        }
    }
}
