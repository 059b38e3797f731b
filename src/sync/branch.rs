use tracing::info;

use super::{commit_pending, Phase, Synchronizer};
use crate::error::{Error, Result};
use crate::git::Git;
use crate::output::step;
use crate::project::Project;
use crate::terminal::Terminal;

impl Synchronizer<'_> {
    /// Commits pending work and pushes `reference` (the checked out branch
    /// when `None`) to origin. No server is touched.
    pub(super) fn deploy_branch(
        &mut self,
        project: &mut Project,
        reference: Option<&str>,
    ) -> Result<()> {
        self.begin()?;
        if project.repository_url().is_none() {
            return Err(Error::Validation(format!(
                "no origin remote in {}/.git/config",
                project.directory().display()
            )));
        }
        let local = Terminal::local(self.runner, project.directory());
        let git = Git::new(&local);

        self.advance(Phase::ConnectingSource)?;
        let reference = match reference.map(str::trim) {
            Some(reference) if !reference.is_empty() => reference.to_string(),
            _ => git.current_branch()?.trim().to_string(),
        };
        if reference == "HEAD" {
            return Err(Error::Validation(
                "not on a branch (detached HEAD), name one with branch:<name>".to_string(),
            ));
        }

        self.advance(Phase::SynchronizingVcs)?;
        commit_pending(git, self.prompt)?;
        step(&format!("Pushing {reference} to origin"), || {
            git.push("origin", &reference)
        })?;

        self.advance(Phase::Done)?;
        info!("pushed branch {reference} of {}", project.name);
        eprintln!();
        eprintln!("Branch {reference} is up to date on origin");
        Ok(())
    }
}
