//! Elevated shell sessions.
//!
//! One `su` process per call: the command and an `exit` are written to its
//! stdin, stdout is drained line by line until EOF, then the process is reaped.
//! There is no pooling and no sanitization of the command text; callers pass
//! fixed diagnostic commands.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const ROOT_HINT: &str = "Make sure your device is rooted and you granted permission.";

/// Minimum wait for the exit status once output reached EOF.
const REAP_GRACE: Duration = Duration::from_millis(100);

/// Discriminant for a failed elevated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Spawn,
    Io,
    Timeout,
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to start {binary}: {source}\n\n{hint}", hint = ROOT_HINT)]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("{stage} failed: {source}\n\n{hint}", hint = ROOT_HINT)]
    Io {
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("session timed out after {}s\n\n{hint}", .after.as_secs_f64(), hint = ROOT_HINT)]
    Timeout { after: Duration },
}

impl ShellError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ShellError::Spawn { .. } => FailureKind::Spawn,
            ShellError::Io { .. } => FailureKind::Io,
            ShellError::Timeout { .. } => FailureKind::Timeout,
        }
    }

    fn io(stage: &'static str, source: io::Error) -> Self {
        ShellError::Io { stage, source }
    }
}

/// Combined output of a concluded session, or why it did not conclude.
pub type ShellResult = Result<String, ShellError>;

/// Legacy single-string rendering: output as-is, failures as `Error: ...` text.
pub fn render_in_band(result: &ShellResult) -> String {
    match result {
        Ok(text) => text.clone(),
        Err(e) => format!("Error: {}", e),
    }
}

pub trait ElevatedShell: Send + Sync {
    /// Run `command` in a fresh elevated session. `None` waits indefinitely.
    fn execute(&self, command: &str, deadline: Option<Duration>) -> ShellResult;
}

impl<T: ElevatedShell + ?Sized> ElevatedShell for Box<T> {
    fn execute(&self, command: &str, deadline: Option<Duration>) -> ShellResult {
        (**self).execute(command, deadline)
    }
}

impl<T: ElevatedShell + ?Sized> ElevatedShell for Arc<T> {
    fn execute(&self, command: &str, deadline: Option<Duration>) -> ShellResult {
        (**self).execute(command, deadline)
    }
}

/// Spawns the elevation binary (normally `su`) for each command.
#[derive(Debug, Clone)]
pub struct SuShell {
    binary: PathBuf,
}

impl SuShell {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ElevatedShell for SuShell {
    fn execute(&self, command: &str, deadline: Option<Duration>) -> ShellResult {
        let started = Instant::now();
        debug!(binary = %self.binary.display(), command, "opening elevated session");

        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        // Own process group, so a timeout can kill whatever the command started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .map_err(|source| ShellError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        let mut session = Session::new(child);
        session.send(command)?;
        let output = session.drain(deadline)?;

        match session.reap(reap_budget(deadline, started.elapsed()))? {
            Some(status) if !status.success() => {
                debug!(%status, command, "elevated session exited non-zero");
            }
            Some(_) => {}
            None => {
                return Err(ShellError::Timeout {
                    after: deadline.unwrap_or_default(),
                })
            }
        }

        Ok(output)
    }
}

/// Owns the child for the length of one call. Dropping it closes stdin and,
/// if the child has not been reaped, kills its process group and reaps it.
/// Errors are ignored.
struct Session {
    child: Child,
    reaped: bool,
}

impl Session {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    /// Write the command, then `exit`, and close stdin.
    fn send(&mut self, command: &str) -> Result<(), ShellError> {
        let mut stdin = self
            .child
            .stdin
            .take()
            .ok_or_else(|| ShellError::io("write", missing_pipe("stdin")))?;

        // Merge the interpreter's stderr into the stream we read.
        let script = format!("exec 2>&1\n{}\nexit\n", command);
        let written = stdin
            .write_all(script.as_bytes())
            .and_then(|()| stdin.flush());

        match written {
            Ok(()) => Ok(()),
            // The interpreter closed its input early; whatever it printed is still readable.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("elevated session closed stdin before the command was written");
                Ok(())
            }
            Err(e) => Err(ShellError::io("write", e)),
        }
    }

    /// Read stdout to EOF. Must complete before `reap`.
    fn drain(&mut self, deadline: Option<Duration>) -> Result<String, ShellError> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| ShellError::io("read", missing_pipe("stdout")))?;

        let Some(limit) = deadline else {
            return read_lines(stdout).map_err(|e| ShellError::io("read", e));
        };

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(read_lines(stdout));
        });

        match rx.recv_timeout(limit) {
            Ok(result) => result.map_err(|e| ShellError::io("read", e)),
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_secs = limit.as_secs_f64(), "elevated session timed out");
                Err(ShellError::Timeout { after: limit })
            }
            Err(RecvTimeoutError::Disconnected) => Err(ShellError::io(
                "read",
                io::Error::other("output reader exited unexpectedly"),
            )),
        }
    }

    fn reap(&mut self, deadline: Option<Duration>) -> Result<Option<ExitStatus>, ShellError> {
        let status =
            wait_with_deadline(&mut self.child, deadline).map_err(|e| ShellError::io("wait", e))?;
        self.reaped = status.is_some();
        Ok(status)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        drop(self.child.stdin.take());
        if !self.reaped {
            kill_group(&self.child);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Time left for `reap` after draining, never less than `REAP_GRACE`.
fn reap_budget(deadline: Option<Duration>, elapsed: Duration) -> Option<Duration> {
    deadline.map(|d| d.saturating_sub(elapsed).max(REAP_GRACE))
}

/// SIGKILL the child's process group. The child is the group leader.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let _ = unsafe { libc::killpg(child.id() as libc::pid_t, libc::SIGKILL) };
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn missing_pipe(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, format!("{} was not captured", name))
}

/// Accumulate lines in order, each terminated by `\n`. Invalid UTF-8 is replaced.
fn read_lines(stream: impl Read) -> io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut output = String::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let trimmed = line
            .strip_suffix(b"\n")
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .unwrap_or(&line);
        output.push_str(&String::from_utf8_lossy(trimmed));
        output.push('\n');
    }

    Ok(output)
}

/// Wait for `child`, giving up after `deadline`. `Ok(None)` means it is still running.
pub(crate) fn wait_with_deadline(
    child: &mut Child,
    deadline: Option<Duration>,
) -> io::Result<Option<ExitStatus>> {
    let Some(limit) = deadline else {
        return child.wait().map(Some);
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= limit {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}
