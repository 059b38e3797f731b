//! Command execution against a local directory or a remote host, with an
//! explicit error policy.
//!
//! A [`Terminal`] runs single shell command lines through a
//! [`CommandRunner`]. By default a non-zero exit is fatal: it is logged at
//! ERROR and returned as [`Error::CommandFailed`]. A failure can be downgraded
//! for exactly one command with [`Terminal::ignore_error`] (or
//! [`Terminal::try_run`]), which logs a warning and hands back the output.
//! The downgrade is a value consumed by that one call, so there is no flag
//! left armed for the next command.
//!
//! [`CommandSession`] batches several commands into one `a && b && c`
//! invocation, and [`FileTransfer`] copies files to and from a host over
//! the same authenticated connection.

use std::path::{Path, PathBuf};

use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::profile::ConnectionProfile;
use crate::runner::{CommandOutput, CommandRunner};
use crate::transport::Direction;

/// Where a terminal's commands run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A local working directory.
    Local(PathBuf),
    /// A remote host reached over ssh.
    Remote(ConnectionProfile),
}

/// What to do when a command exits non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    FailFast,
    Ignore,
}

/// Result of a command whose failure was tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// stdout on success; stdout followed by stderr on failure.
    pub output: String,
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl Attempt {
    pub fn contains(&self, needle: &str) -> bool {
        self.output.contains(needle)
    }
}

/// Runs command lines on one target.
pub struct Terminal<'r> {
    runner: &'r dyn CommandRunner,
    target: Target,
}

impl<'r> Terminal<'r> {
    /// A terminal running commands in `dir` on this machine.
    pub fn local(runner: &'r dyn CommandRunner, dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            target: Target::Local(dir.into()),
        }
    }

    /// Opens a session to a remote host.
    ///
    /// The host is probed immediately; a host that cannot be reached or
    /// refuses the key yields [`Error::Authentication`] here rather than on
    /// the first real command.
    pub fn connect(runner: &'r dyn CommandRunner, profile: ConnectionProfile) -> Result<Self> {
        probe(runner, &profile)?;
        Ok(Self {
            runner,
            target: Target::Remote(profile),
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn profile(&self) -> Option<&ConnectionProfile> {
        match &self.target {
            Target::Remote(profile) => Some(profile),
            Target::Local(_) => None,
        }
    }

    /// Short description for log lines: the directory or `user@host`.
    pub fn describe(&self) -> String {
        match &self.target {
            Target::Local(dir) => dir.display().to_string(),
            Target::Remote(profile) => profile.destination(),
        }
    }

    /// Runs `command`, failing on a non-zero exit. Returns stdout.
    pub fn run(&self, command: &str) -> Result<String> {
        self.execute(command, ErrorPolicy::FailFast)
            .map(|attempt| attempt.output)
    }

    /// Runs `command`, tolerating a non-zero exit.
    pub fn try_run(&self, command: &str) -> Result<Attempt> {
        self.execute(command, ErrorPolicy::Ignore)
    }

    /// Downgrades the failure of the next command to a warning.
    ///
    /// The returned value is consumed by its `run`, so the terminal itself
    /// stays fail-fast.
    pub fn ignore_error(&self) -> Lenient<'_, 'r> {
        Lenient { terminal: self }
    }

    /// Starts batching commands for a single joined invocation.
    pub fn start_session(&self) -> CommandSession<'_, 'r> {
        CommandSession {
            terminal: self,
            commands: Vec::new(),
        }
    }

    /// A file transfer channel to this terminal's host, sharing its
    /// authenticated connection.
    pub fn file_transfer(&self) -> Result<FileTransfer<'r>> {
        match &self.target {
            Target::Remote(profile) => Ok(FileTransfer {
                runner: self.runner,
                profile: profile.clone(),
            }),
            Target::Local(dir) => Err(Error::Validation(format!(
                "no file transfer to a local directory ({})",
                dir.display()
            ))),
        }
    }

    /// Runs `command` under `policy`.
    pub fn execute(&self, command: &str, policy: ErrorPolicy) -> Result<Attempt> {
        let where_ = self.describe();
        debug!("[{where_}] $ {command}");

        let output = match &self.target {
            Target::Local(dir) => self.runner.run_local(dir, command)?,
            Target::Remote(profile) => self.runner.run_ssh(profile, command)?,
        };
        trace!("[{where_}] stdout: {}", output.stdout);

        if output.status.success() {
            return Ok(Attempt {
                output: output.stdout,
                success: true,
                code: output.status.code(),
            });
        }

        let detail = failure_detail(&output);
        match policy {
            ErrorPolicy::FailFast => {
                error!("[{where_}] {command} failed: {detail}");
                Err(Error::CommandFailed {
                    command: command.to_string(),
                    message: detail,
                })
            }
            ErrorPolicy::Ignore => {
                warn!("[{where_}] {command} failed (ignored): {detail}");
                Ok(Attempt {
                    output: format!("{}{}", output.stdout, output.stderr),
                    success: false,
                    code: output.status.code(),
                })
            }
        }
    }
}

/// Best available explanation for a failed command.
fn failure_detail(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    output.status.to_string()
}

fn probe(runner: &dyn CommandRunner, profile: &ConnectionProfile) -> Result<()> {
    let host = format!("{}:{}", profile.destination(), profile.port);
    debug!("probing {host}");
    match runner.run_ssh(profile, "true") {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(Error::Authentication {
            host,
            message: failure_detail(&output),
        }),
        Err(e) => Err(Error::Authentication {
            host,
            message: e.to_string(),
        }),
    }
}

/// A one-shot tolerant view of a [`Terminal`].
pub struct Lenient<'t, 'r> {
    terminal: &'t Terminal<'r>,
}

impl Lenient<'_, '_> {
    pub fn run(self, command: &str) -> Result<Attempt> {
        self.terminal.execute(command, ErrorPolicy::Ignore)
    }
}

/// Commands queued for one `&&`-joined invocation.
///
/// Only a session can queue or flush commands, so batching outside a session
/// cannot be expressed.
pub struct CommandSession<'t, 'r> {
    terminal: &'t Terminal<'r>,
    commands: Vec<String>,
}

impl CommandSession<'_, '_> {
    pub fn add(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The joined command line that `execute` will run.
    pub fn command_line(&self) -> String {
        self.commands.join(" && ")
    }

    /// Runs the batch as one command, stopping at the first failure.
    /// An empty session runs nothing.
    pub fn execute(self) -> Result<String> {
        if self.commands.is_empty() {
            return Ok(String::new());
        }
        self.terminal.run(&self.command_line())
    }

    /// Like [`execute`](Self::execute) but tolerates a failing batch.
    pub fn try_execute(self) -> Result<Attempt> {
        if self.commands.is_empty() {
            return Ok(Attempt {
                output: String::new(),
                success: true,
                code: Some(0),
            });
        }
        self.terminal.try_run(&self.command_line())
    }
}

/// Copies single files between local disk and a remote host.
///
/// There is no resume: a failed transfer is reported and must be retried
/// from scratch.
pub struct FileTransfer<'r> {
    runner: &'r dyn CommandRunner,
    profile: ConnectionProfile,
}

impl<'r> FileTransfer<'r> {
    /// Opens a transfer channel, probing the host first.
    pub fn connect(runner: &'r dyn CommandRunner, profile: ConnectionProfile) -> Result<Self> {
        probe(runner, &profile)?;
        Ok(Self { runner, profile })
    }

    pub fn upload(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        self.copy(Direction::Upload, remote_path, local_path)
    }

    pub fn download(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        self.copy(Direction::Download, remote_path, local_path)
    }

    fn copy(&self, direction: Direction, remote_path: &str, local_path: &Path) -> Result<()> {
        let description = match direction {
            Direction::Upload => format!(
                "upload {} to {}:{remote_path}",
                local_path.display(),
                self.profile.destination()
            ),
            Direction::Download => format!(
                "download {}:{remote_path} to {}",
                self.profile.destination(),
                local_path.display()
            ),
        };
        debug!("{description}");

        let output = self
            .runner
            .run_scp(&self.profile, direction, local_path, remote_path)?;
        if !output.status.success() {
            let message = failure_detail(&output);
            error!("{description} failed: {message}");
            return Err(Error::CommandFailed {
                command: description,
                message,
            });
        }
        Ok(())
    }
}
