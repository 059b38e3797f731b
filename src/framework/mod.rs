//! Pluggable per-framework behaviour.
//!
//! A framework knows where its uploads live and how to configure a freshly
//! deployed copy of the site for an environment (database credentials,
//! writable directories, dependency installation). Deployment calls
//! [`Framework::configure_environment`] after the site's files are in place;
//! an error from it aborts the deployment.

mod laravel;
mod wordpress;

use std::path::Path;

pub use laravel::Laravel;
pub use wordpress::WordPress;

use crate::environment::Environment;
use crate::error::Result;
use crate::project::Project;
use crate::terminal::Terminal;

/// A deployed copy of the site: where it lives and how to run commands there.
///
/// For dev the terminal is local and `directory` is the project directory;
/// for servers it is the remote session and the remote site directory.
pub struct Site<'t, 'r> {
    pub terminal: &'t Terminal<'r>,
    pub directory: String,
}

impl Site<'_, '_> {
    /// Whether `directory` is on this machine.
    pub fn is_local(&self) -> bool {
        self.terminal.profile().is_none()
    }
}

pub trait Framework: Sync {
    /// Canonical name stored in `Dirtfile.json`.
    fn name(&self) -> &'static str;

    /// Alternative names accepted on the command line.
    fn shortcuts(&self) -> &'static [&'static str];

    /// Uploads folder relative to the project root, if the framework has one.
    fn uploads_folder(&self, project_dir: &Path) -> Option<String>;

    /// Prepares the site in `site` for `environment`.
    fn configure_environment(
        &self,
        environment: &Environment,
        project: &mut Project,
        site: &Site<'_, '_>,
    ) -> Result<()>;
}

static WORDPRESS: WordPress = WordPress;
static LARAVEL: Laravel = Laravel;

/// Every supported framework.
pub fn all() -> [&'static dyn Framework; 2] {
    [&WORDPRESS, &LARAVEL]
}

/// Looks a framework up by name or shortcut, case-insensitively.
pub fn find(name: &str) -> Option<&'static dyn Framework> {
    let name = name.trim().to_lowercase();
    all().into_iter().find(|framework| {
        framework.name() == name || framework.shortcuts().contains(&name.as_str())
    })
}

/// Comma-separated list of accepted names, for error messages.
pub fn names() -> String {
    all()
        .iter()
        .map(|framework| framework.name())
        .collect::<Vec<_>>()
        .join(", ")
}
