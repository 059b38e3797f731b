//! Environment synchronization: deploy, undeploy and transfer.
//!
//! A [`Synchronizer`] drives one operation at a time through the phases of
//! [`Phase`]. Every step prints a status line before it runs, so a failure is
//! attributed to the step that caused it. Steps that destroy data on a
//! destination run only after the user confirmed and after every check that
//! can fail without side effects has passed.

mod branch;
mod production;
mod staging;
mod transfer;
mod wpengine;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub use transfer::TransferOptions;

use crate::config::{Configuration, MysqlAdmin};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::framework::{Framework, Site};
use crate::git::{self, Git};
use crate::output::step;
use crate::profile::ConnectionProfile;
use crate::project::Project;
use crate::prompt::Prompt;
use crate::remote;
use crate::runner::CommandRunner;
use crate::terminal::Terminal;

/// Where an operation is in its protocol.
///
/// Deploys move forward through the phases (skipping those they do not
/// need) and end in `Done`. Undeploys go straight from `Idle` to
/// `Undeploying`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ConnectingSource,
    SynchronizingVcs,
    SynchronizingFiles,
    SynchronizingDatabase,
    Done,
    Undeploying,
}

impl Phase {
    fn rank(self) -> Option<u8> {
        match self {
            Phase::Idle => Some(0),
            Phase::ConnectingSource => Some(1),
            Phase::SynchronizingVcs => Some(2),
            Phase::SynchronizingFiles => Some(3),
            Phase::SynchronizingDatabase => Some(4),
            Phase::Done => Some(5),
            Phase::Undeploying => None,
        }
    }

    /// Whether an operation in this phase may move on to `next`.
    pub fn can_advance_to(self, next: Phase) -> bool {
        match (self, next) {
            (Phase::Idle, Phase::Undeploying) => true,
            (Phase::Undeploying, Phase::Done) => true,
            (current, next) => match (current.rank(), next.rank()) {
                (Some(current), Some(next)) => next > current,
                _ => false,
            },
        }
    }
}

/// Flags shared by deploys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    /// Skip the question about opening the site in a browser.
    pub no_prompt: bool,
}

/// Runs deploy, undeploy and transfer operations.
pub struct Synchronizer<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a Configuration,
    prompt: &'a dyn Prompt,
    phase: Phase,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        config: &'a Configuration,
        prompt: &'a dyn Prompt,
    ) -> Self {
        Self {
            runner,
            config,
            prompt,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Deploys the project to `environment`.
    pub fn deploy(
        &mut self,
        project: &mut Project,
        environment: &Environment,
        options: &DeployOptions,
    ) -> Result<()> {
        match environment {
            Environment::Staging => self.deploy_staging(project, options),
            Environment::Production => self.deploy_production(project, options),
            Environment::WpEngine => self.deploy_wpengine(project),
            Environment::Branch(reference) => self.deploy_branch(project, reference.as_deref()),
            Environment::Dev => Err(Error::Validation(
                "the dev environment is deployed with `vagrant up`, not `dirt deploy`".to_string(),
            )),
        }
    }

    /// Removes the project from `environment`.
    pub fn undeploy(&mut self, project: &mut Project, environment: &Environment) -> Result<()> {
        match environment {
            Environment::Staging => self.undeploy_staging(project),
            Environment::Production | Environment::WpEngine | Environment::Branch(_) => {
                eprintln!("This feature is not available for {} deployment", environment.name());
                Ok(())
            }
            Environment::Dev => Err(Error::Validation(
                "the dev environment is removed with `vagrant destroy`".to_string(),
            )),
        }
    }

    /// Resets to `Idle` for a new operation.
    fn begin(&mut self) -> Result<()> {
        match self.phase {
            Phase::Idle | Phase::Done => {
                self.phase = Phase::Idle;
                Ok(())
            }
            other => Err(Error::Validation(format!(
                "another operation is still in progress ({other:?})"
            ))),
        }
    }

    fn advance(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_advance_to(next) {
            return Err(Error::Validation(format!(
                "cannot move from {:?} to {next:?}",
                self.phase
            )));
        }
        debug!("phase {:?} -> {next:?}", self.phase);
        self.phase = next;
        Ok(())
    }

    /// Asks before a destructive operation. `false` means the user declined
    /// and the operation should stop without error.
    fn confirm(&self, question: &str) -> Result<bool> {
        let confirmed = self.prompt.confirm(question, false)?;
        if !confirmed {
            eprintln!("Aborted.");
        }
        Ok(confirmed)
    }

    /// Opens a terminal on the host of `environment`. The dev profile is
    /// read from vagrant in the project directory.
    fn connect(&self, environment: &Environment, project: &Project) -> Result<Terminal<'a>> {
        let runner = self.runner;
        let config = self.config;
        step(&format!("Connecting to {} server", environment.name()), || {
            let profile = match environment {
                Environment::Dev => ConnectionProfile::from_vagrant(runner, project.directory())?,
                other => ConnectionProfile::from_server(config.server(other)?),
            };
            Terminal::connect(runner, profile)
        })
    }

    /// Prints the deployed URL and offers to open it.
    fn finish(&self, project: &Project, url: &str, options: &DeployOptions) -> Result<()> {
        eprintln!();
        eprintln!("Deployment finished to {url}");
        if options.no_prompt {
            return Ok(());
        }
        if self
            .prompt
            .confirm("Do you want to open your web browser now?", true)?
        {
            let local = Terminal::local(self.runner, project.directory());
            let attempt = local.try_run(&open_url_command(url))?;
            if !attempt.success {
                warn!("could not open {url}: {}", attempt.output.trim());
            }
        }
        Ok(())
    }
}

/// The platform's command for opening a URL in the default browser.
pub fn open_url_command(url: &str) -> String {
    if cfg!(target_os = "macos") {
        format!("open {url}")
    } else if cfg!(windows) {
        format!("cmd /C start {url}")
    } else {
        format!("xdg-open {url}")
    }
}

/// Commits uncommitted changes after showing the diff and asking for a
/// message. Does nothing on a clean tree.
fn commit_pending(git: Git<'_, '_>, prompt: &dyn Prompt) -> Result<()> {
    let status = git.status()?;
    if !git::has_changes(&status) {
        return Ok(());
    }

    eprintln!("{}", git.ignore_error().diff()?);
    let message = prompt.input("You have uncommitted changes, please provide a commit message")?;
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::Validation("a commit message is required".to_string()));
    }
    git.add("-A .")?;
    git.commit(message)?;
    Ok(())
}

/// Runs the project's framework hook for `environment` on `site`.
pub(crate) fn configure_framework(
    framework: &dyn Framework,
    environment: &Environment,
    project: &mut Project,
    site: &Site<'_, '_>,
) -> Result<()> {
    step(&format!("Configuring {}", framework.name()), || {
        framework
            .configure_environment(environment, project, site)
            .map_err(|e| match e {
                Error::Framework { .. } => e,
                other => Error::Framework {
                    framework: framework.name().to_string(),
                    message: other.to_string(),
                },
            })
    })
}

/// Gives the web server group write access to `directory`, with sudo when
/// the account may use it without a password and without otherwise.
fn grant_group_write(terminal: &Terminal<'_>, group: &str, directory: &str) -> Result<()> {
    let privileged = terminal.try_run(&remote::group_write(group, directory, true))?;
    if !privileged.success {
        info!("sudo unavailable, setting group permissions unprivileged");
        terminal.run(&remote::group_write(group, directory, false))?;
    }
    Ok(())
}

/// MySQL administrator account of a server profile.
fn mysql_admin<'p>(profile: Option<&'p ConnectionProfile>, environment: &Environment) -> Result<&'p MysqlAdmin> {
    profile.and_then(|profile| profile.mysql.as_ref()).ok_or_else(|| {
        Error::Validation(format!(
            "no mysql administrator configured for {environment} (environments.{}.mysql)",
            environment.name()
        ))
    })
}

/// A local scratch file removed when dropped.
struct ScratchFile(PathBuf);

impl ScratchFile {
    fn new(name: &str) -> Self {
        Self(std::env::temp_dir().join(name))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove {}: {e}", self.0.display());
            }
        }
    }
}
