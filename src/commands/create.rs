//! `dirt create <name>`: scaffolds a new project.
//!
//! Creates the hosted repository, writes the project files from templates,
//! commits them and pushes the primary branch. The framework itself is not
//! installed here; once its files are in place `dirt apply` configures the
//! dev environment for it.

use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::framework;
use crate::git::Git;
use crate::output::step;
use crate::project::Project;
use crate::repository::{self, RepositoryHost};
use crate::runner::CommandRunner;
use crate::template::{Template, Templates, Variables};
use crate::terminal::Terminal;

const INITIAL_COMMIT: &str = "Initial commit, added README, gitignore, Dirtfile and Vagrantfile";

/// Arguments of `dirt create`.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub name: String,
    pub framework: Option<String>,
    pub description: Option<String>,
}

/// The repository host to create the project on, or `None` with
/// `--skip-repository`.
pub fn repository_host(
    config: &Configuration,
    skip_repository: bool,
) -> Result<Option<Box<dyn RepositoryHost>>> {
    if skip_repository {
        return Ok(None);
    }
    match &config.scm {
        Some(scm) => Ok(Some(repository::from_config(scm))),
        None => Err(Error::Validation(
            "no [scm] section in the configuration, add one or pass --skip-repository"
                .to_string(),
        )),
    }
}

/// Creates the project in `parent` and returns its directory.
pub fn run(
    runner: &dyn CommandRunner,
    config: &Configuration,
    host: Option<&dyn RepositoryHost>,
    parent: &Path,
    options: &CreateOptions,
) -> Result<PathBuf> {
    let mut project = Project::new(&options.name, parent, config);
    if project.name.is_empty() {
        return Err(Error::Validation(format!(
            "{:?} does not make a usable project name",
            options.name
        )));
    }
    project.description = options.description.clone().filter(|d| !d.trim().is_empty());

    if project.directory().exists() {
        return Err(Error::Validation(format!(
            "directory {} already exists",
            project.directory().display()
        )));
    }
    if let Some(name) = &options.framework {
        let framework = framework::find(name).ok_or_else(|| {
            Error::Validation(format!(
                "invalid framework {name}, valid frameworks are: {}",
                framework::names()
            ))
        })?;
        project.framework = Some(framework.name().to_string());
    }

    eprintln!("Creating new project in {}", project.directory().display());
    if let Some(host) = host {
        step("Creating repository", || host.create(&mut project))?;
    }

    step("Adding initial files", || write_initial_files(&mut project, config))?;

    let local = Terminal::local(runner, project.directory());
    step("Initializing git repository", || {
        initialize_git(Git::new(&local), &project, &config.primary_branch)
    })?;

    show_project_info(&mut project)?;
    Ok(project.directory().to_path_buf())
}

fn write_initial_files(project: &mut Project, config: &Configuration) -> Result<()> {
    std::fs::create_dir_all(project.directory().join("public"))?;
    let variables = Variables::for_project(project)?;
    // Both credential sets are printed at the end, so persist them now
    project.database_credentials(&Environment::Staging)?;

    let templates = Templates::new(config);
    for template in [Template::Readme, Template::Gitignore, Template::Vagrantfile] {
        templates.write(template, &variables, project.directory())?;
    }
    project.save()
}

fn initialize_git(git: Git<'_, '_>, project: &Project, primary_branch: &str) -> Result<()> {
    git.init()?;
    git.add("-A .")?;
    git.commit(INITIAL_COMMIT)?;
    git.branch(Some(format!("-M {primary_branch}").as_str()))?;
    if let Some(url) = project.repository_url() {
        git.remote_add("origin", url)?;
        git.push_upstream("origin", primary_branch)?;
    }
    Ok(())
}

fn show_project_info(project: &mut Project) -> Result<()> {
    eprintln!();
    eprintln!("{} has now been created.", project.name_full);
    eprintln!("Development: {}", project.urls.dev);
    eprintln!("Staging: {}", project.urls.staging);
    eprintln!("Production: N/A");
    if let Some(url) = project.repository_url() {
        eprintln!("Repository: {url}");
    }

    for (label, environment) in [
        ("Development", Environment::Dev),
        ("Staging", Environment::Staging),
    ] {
        let credentials = project.database_credentials(&environment)?;
        eprintln!();
        eprintln!("{label} MySQL credentials");
        eprintln!("Username: {}", credentials.username);
        eprintln!("Password: {}", credentials.password);
        eprintln!("Database: {}", credentials.database);
    }

    eprintln!();
    if let Some(framework) = project.framework()? {
        eprintln!(
            "Install {} into the project, then run \"dirt apply\" to configure it.",
            framework.name()
        );
    }
    eprintln!("You can now run \"cd {} && vagrant up\"", project.name);
    Ok(())
}
