//! `dirt branch <name>`: starts a feature branch and publishes it.

use std::path::Path;

use crate::error::{Error, Result};
use crate::git::Git;
use crate::output::step;
use crate::runner::CommandRunner;
use crate::terminal::Terminal;

/// Creates branch `name` (lower-cased) in the project at `directory`,
/// pushes it to origin unless `skip_repository`, and checks it out.
pub fn run(
    runner: &dyn CommandRunner,
    directory: &Path,
    name: &str,
    skip_repository: bool,
) -> Result<()> {
    let branch = name.trim().to_lowercase();
    if branch.is_empty() {
        return Err(Error::Validation("please name the branch".to_string()));
    }
    let local = Terminal::local(runner, directory);
    let git = Git::new(&local);

    step("Checking if branch already exists", || {
        let branches = git.branch(None)?;
        if list_contains(&branches, &branch) {
            return Err(Error::Validation(format!(
                "a branch named {branch} already exists"
            )));
        }
        Ok(())
    })?;
    step("Creating new branch locally", || git.branch(Some(branch.as_str())))?;

    if skip_repository {
        eprintln!("You will need to push {branch} to origin yourself.");
    } else {
        step("Pushing branch to origin", || git.push_upstream("origin", &branch))?;
    }

    step(&format!("Switching to branch {branch}"), || git.checkout(&branch))?;
    eprintln!("You are now working on branch {branch}");
    Ok(())
}

/// Whether `git branch` output lists `name`.
fn list_contains(branches: &str, name: &str) -> bool {
    branches
        .lines()
        .map(|line| line.trim_start_matches(['*', '+']).trim())
        .any(|line| line == name)
}
