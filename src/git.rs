//! git command construction and execution.
//!
//! The free functions build command strings and never execute anything.
//! [`Git`] runs the same vocabulary through a [`Terminal`]. Only the commit
//! message is quoted; every other argument is passed through verbatim and
//! must already be safe for the shell.

use shell_quote::{Bash, QuoteRefExt};

use crate::error::Result;
use crate::terminal::{ErrorPolicy, Terminal};

/// Marker printed by `git status` on a clean working tree.
const CLEAN_TREE: &str = "nothing to commit";

pub fn init() -> String {
    "git init".to_string()
}

pub fn checkout(reference: &str) -> String {
    format!("git checkout {reference}")
}

/// `git branch` lists branches; with a name it creates one.
pub fn branch(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("git branch {name}"),
        None => "git branch".to_string(),
    }
}

pub fn current_branch() -> String {
    "git rev-parse --abbrev-ref HEAD".to_string()
}

pub fn status() -> String {
    "git status".to_string()
}

pub fn diff() -> String {
    "git diff".to_string()
}

pub fn add(pathspec: &str) -> String {
    format!("git add {pathspec}")
}

/// Commits all tracked changes. The message is shell-quoted.
pub fn commit(message: &str) -> String {
    let quoted: String = message.quoted(Bash);
    format!("git commit -am {quoted}")
}

pub fn push(remote: &str, reference: &str) -> String {
    format!("git push {remote} {reference}")
}

/// Pushes and records `remote` as the upstream of `reference`.
pub fn push_upstream(remote: &str, reference: &str) -> String {
    format!("git push -u {remote} {reference}")
}

pub fn fetch(args: &str) -> String {
    format!("git fetch {args}")
}

pub fn reset(flags: &str, reference: &str) -> String {
    format!("git reset {flags} {reference}")
}

pub fn merge(reference: &str) -> String {
    format!("git merge {reference}")
}

pub fn clone(url: &str, destination: Option<&str>) -> String {
    match destination {
        Some(destination) => format!("git clone {url} {destination}"),
        None => format!("git clone {url}"),
    }
}

pub fn remote_add(name: &str, url: &str) -> String {
    format!("git remote add {name} {url}")
}

/// Whether `git status` output shows uncommitted changes.
pub fn has_changes(status_output: &str) -> bool {
    !status_output.contains(CLEAN_TREE)
}

/// Runs git commands through a terminal.
///
/// `Git` is `Copy` and every method takes `self`, so
/// `git.ignore_error().branch(..)` tolerates a failure of that one command
/// while `git` itself stays fail-fast.
#[derive(Clone, Copy)]
pub struct Git<'t, 'r> {
    terminal: &'t Terminal<'r>,
    policy: ErrorPolicy,
}

impl<'t, 'r> Git<'t, 'r> {
    pub fn new(terminal: &'t Terminal<'r>) -> Self {
        Self {
            terminal,
            policy: ErrorPolicy::FailFast,
        }
    }

    pub fn ignore_error(self) -> Self {
        Self {
            policy: ErrorPolicy::Ignore,
            ..self
        }
    }

    fn run(self, command: String) -> Result<String> {
        let attempt = self.terminal.execute(&command, self.policy)?;
        Ok(attempt.output)
    }

    pub fn init(self) -> Result<String> {
        self.run(init())
    }

    pub fn checkout(self, reference: &str) -> Result<String> {
        self.run(checkout(reference))
    }

    pub fn branch(self, name: Option<&str>) -> Result<String> {
        self.run(branch(name))
    }

    /// Name of the checked-out branch.
    pub fn current_branch(self) -> Result<String> {
        Ok(self.run(current_branch())?.trim().to_string())
    }

    pub fn status(self) -> Result<String> {
        self.run(status())
    }

    pub fn diff(self) -> Result<String> {
        self.run(diff())
    }

    pub fn add(self, pathspec: &str) -> Result<String> {
        self.run(add(pathspec))
    }

    pub fn commit(self, message: &str) -> Result<String> {
        self.run(commit(message))
    }

    pub fn push(self, remote: &str, reference: &str) -> Result<String> {
        self.run(push(remote, reference))
    }

    pub fn push_upstream(self, remote: &str, reference: &str) -> Result<String> {
        self.run(push_upstream(remote, reference))
    }

    pub fn fetch(self, args: &str) -> Result<String> {
        self.run(fetch(args))
    }

    pub fn reset(self, flags: &str, reference: &str) -> Result<String> {
        self.run(reset(flags, reference))
    }

    pub fn merge(self, reference: &str) -> Result<String> {
        self.run(merge(reference))
    }

    pub fn clone(self, url: &str, destination: Option<&str>) -> Result<String> {
        self.run(clone(url, destination))
    }

    pub fn remote_add(self, name: &str, url: &str) -> Result<String> {
        self.run(remote_add(name, url))
    }
}
