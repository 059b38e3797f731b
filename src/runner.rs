//! Trait abstraction for executing external commands (local shell, ssh, scp).
//!
//! All orchestration code goes through [`CommandRunner`] rather than calling
//! `std::process::Command` directly. This enables unit-testing command
//! sequences with a mock implementation that records invocations and returns
//! canned results, without needing a VM, a server or real SSH.
//!
//! The runner only captures output. Deciding whether a non-zero exit is fatal
//! is the job of [`Terminal`](crate::terminal::Terminal).

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use shell_quote::{Bash, QuoteRefExt};

use crate::error::{Error, Result};
use crate::profile::ConnectionProfile;
use crate::transport::{scp_args, ssh_args, Direction};

/// Ceiling for local commands such as `git push` or `composer install`.
pub const LOCAL_TIMEOUT: Duration = Duration::from_secs(3600);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Output captured from a non-interactive command.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// Abstraction over shelling out locally and to remote hosts.
///
/// - `run_local`: `bash -c <command>` in a working directory, captures output.
/// - `run_ssh`: `ssh ... user@host bash -lc <command>`, captures output.
/// - `run_scp`: copies one file to or from the host over the same connection.
pub trait CommandRunner {
    fn run_local(&self, dir: &Path, command: &str) -> Result<CommandOutput>;
    fn run_ssh(&self, profile: &ConnectionProfile, command: &str) -> Result<CommandOutput>;
    fn run_scp(
        &self,
        profile: &ConnectionProfile,
        direction: Direction,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<CommandOutput>;
}

/// Production implementation that shells out via `std::process::Command`.
pub struct ProcessRunner {
    local_timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            local_timeout: LOCAL_TIMEOUT,
        }
    }

    pub fn with_timeout(local_timeout: Duration) -> Self {
        Self { local_timeout }
    }
}

/// Wraps a command in `bash -lc <quoted-command>` so it runs as a login shell.
///
/// Non-interactive SSH sessions don't source `~/.profile` or `~/.bash_profile`,
/// so tools like `composer` installed for the deploy user may be missing from
/// PATH without it.
fn login_shell_wrap(command: &str) -> String {
    let quoted: String = command.quoted(Bash);
    format!("bash -lc {quoted}")
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = source.read_to_end(&mut buffer);
        buffer
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Waits for `child`, killing it once `timeout` has elapsed.
///
/// Output is drained on background threads so a chatty process cannot
/// block on a full pipe while we poll.
fn wait_with_timeout(mut child: Child, command: &str, timeout: Duration) -> Result<CommandOutput> {
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout {
                command: command.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        stdout: join_reader(stdout),
        stderr: join_reader(stderr),
        status,
    })
}

impl CommandRunner for ProcessRunner {
    fn run_local(&self, dir: &Path, command: &str) -> Result<CommandOutput> {
        let child = Command::new("bash")
            .args(["-c", command])
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        wait_with_timeout(child, command, self.local_timeout)
    }

    fn run_ssh(&self, profile: &ConnectionProfile, command: &str) -> Result<CommandOutput> {
        let wrapped = login_shell_wrap(command);
        let output = Command::new("ssh")
            .args(ssh_args(profile))
            .arg(&wrapped)
            .stdin(Stdio::null())
            .output()?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        })
    }

    fn run_scp(
        &self,
        profile: &ConnectionProfile,
        direction: Direction,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<CommandOutput> {
        let output = Command::new("scp")
            .args(scp_args(profile, direction, local_path, remote_path))
            .stdin(Stdio::null())
            .output()?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        })
    }
}
