use tracing::info;

use super::{
    commit_pending, configure_framework, grant_group_write, mysql_admin, DeployOptions, Phase,
    Synchronizer,
};
use crate::config::ServerEnvironment;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::framework::Site;
use crate::git::{self, Git};
use crate::mysql::{Database, MySql};
use crate::output::step;
use crate::project::{DatabaseCredentials, Project};
use crate::prompt::Prompt;
use crate::remote;
use crate::template::{Template, Templates, Variables};
use crate::terminal::Terminal;

/// Branch holding what is deployed to staging.
const STAGING_BRANCH: &str = "staging";

const NOT_A_REPOSITORY: &str = "not a git repository";

const MISSING_FILE: &str = "No such file or directory";

impl Synchronizer<'_> {
    /// Pushes the project to staging: git, then files, then database.
    pub(super) fn deploy_staging(
        &mut self,
        project: &mut Project,
        options: &DeployOptions,
    ) -> Result<()> {
        self.begin()?;
        let config = self.config;
        let environment = Environment::Staging;
        let server = config.server(&environment)?;
        let site_directory = project.site_directory(&environment, config)?;
        let credentials = project.database_credentials(&environment)?;
        project.save()?;

        self.advance(Phase::ConnectingSource)?;
        let repository_url = project
            .repository_url()
            .ok_or_else(|| {
                Error::Validation(format!(
                    "no origin remote in {}/.git/config",
                    project.directory().display()
                ))
            })?
            .to_string();
        let local = Terminal::local(self.runner, project.directory());

        self.advance(Phase::SynchronizingVcs)?;
        eprintln!("Pushing local changes (this may take a few minutes)...");
        synchronize_git(
            Git::new(&local),
            &config.primary_branch,
            STAGING_BRANCH,
            self.prompt,
        )?;

        self.advance(Phase::SynchronizingFiles)?;
        let staging = self.connect(&environment, project)?;
        let configured = step("Checking if site has been configured", || {
            let vhost = remote::vhost_path(&server.webserver, &project.vhost_name());
            Ok(staging.try_run(&remote::file_exists(&vhost))?.success)
        })?;
        if !configured {
            eprintln!("Site is not configured yet, configuring staging server...");
            configure_server(&staging, project, server, &site_directory, &Templates::new(config))?;
        }
        pull(&staging, &site_directory, &repository_url)?;

        if let Some(framework) = project.framework()? {
            let site = Site {
                terminal: &staging,
                directory: site_directory.clone(),
            };
            configure_framework(framework, &environment, project, &site)?;
        }
        step("Updating file permissions", || {
            grant_group_write(&staging, &server.webserver.group, &site_directory)
        })?;

        self.advance(Phase::SynchronizingDatabase)?;
        synchronize_database(&staging, &credentials)?;

        self.advance(Phase::Done)?;
        self.finish(project, &project.http_url(&environment)?, options)
    }

    /// Removes the site, its vhost and its database from staging.
    pub(super) fn undeploy_staging(&mut self, project: &mut Project) -> Result<()> {
        self.begin()?;
        let config = self.config;
        let environment = Environment::Staging;
        let server = config.server(&environment)?;
        // Validated before anything is removed
        let site_directory = project.site_directory(&environment, config)?;
        let credentials = project.database_credentials(&environment)?;

        if !self.confirm(&format!(
            "This removes {site_directory} and the {} database from staging. Continue?",
            credentials.database
        ))? {
            return Ok(());
        }

        self.advance(Phase::Undeploying)?;
        let staging = self.connect(&environment, project)?;
        let admin = mysql_admin(staging.profile(), &environment)?;

        step("Removing vhost", || {
            let vhost = remote::vhost_path(&server.webserver, &project.vhost_name());
            staging.ignore_error().run(&remote::remove_vhost(&vhost))?;
            Ok(())
        })?;
        step("Removing site directory", || {
            staging.run(&remote::remove_site(&site_directory))
        })?;
        step(
            &format!("Removing database \"{}\"", credentials.database),
            || Database::new(&staging, MySql::new(&admin.username, &admin.password)).drop(&credentials),
        )?;

        eprint!("Testing vhost config syntax... ");
        let test = staging.try_run(&server.webserver.configtest)?;
        if test.success {
            eprintln!("OK");
        } else if test.contains(MISSING_FILE) {
            eprintln!("File does not exist. Already removed?");
        } else {
            eprintln!("failed");
            return Err(Error::CommandFailed {
                command: server.webserver.configtest.clone(),
                message: test.output.trim().to_string(),
            });
        }
        step("Restarting httpd", || staging.run(&server.webserver.reload))?;

        self.advance(Phase::Done)?;
        info!("undeployed {} from staging", project.name);
        Ok(())
    }
}

/// Brings `target` up to date with the primary branch and pushes both.
///
/// Creating the target branch and resetting it to its remote counterpart
/// may fail on a first deploy; both failures are tolerated.
fn synchronize_git(git: Git<'_, '_>, primary: &str, target: &str, prompt: &dyn Prompt) -> Result<()> {
    git.checkout(primary)?;
    commit_pending(git, prompt)?;
    git.push("origin", primary)?;
    git.ignore_error().branch(Some(target))?;
    git.checkout(target)?;
    git.fetch("--all")?;
    git.ignore_error().reset("--hard", &format!("origin/{target}"))?;
    git.merge(primary)?;
    git.push("origin", target)?;
    git.checkout(primary)?;
    Ok(())
}

/// First-time setup of a site: vhost, directory, ownership, web server
/// reload.
fn configure_server(
    staging: &Terminal<'_>,
    project: &mut Project,
    server: &ServerEnvironment,
    site_directory: &str,
    templates: &Templates,
) -> Result<()> {
    let variables = Variables::for_project(project)?
        .set("__PROJECT_NAME__", project.name.to_lowercase())
        .set("__SITE_DIRECTORY__", site_directory);
    let vhost_config = templates.render(Template::StagingVhost, &variables)?;
    let vhost = remote::vhost_path(&server.webserver, &project.vhost_name());

    step("\tCreating vhost", || {
        staging.run(&remote::sudo_write_file(&vhost, &vhost_config))
    })?;
    step("\tCreating directory", || {
        staging.run(&remote::mkdir_site(site_directory))
    })?;
    step("\tSetting directory permissions", || {
        staging.run(&remote::chown_site(&server.username, site_directory))
    })?;
    step("\tTesting vhost config syntax", || {
        staging.run(&server.webserver.configtest)
    })?;
    step("\tRestarting httpd", || staging.run(&server.webserver.reload))?;
    Ok(())
}

/// Updates the site's working copy to the staging branch, cloning it on the
/// first deploy.
fn pull(staging: &Terminal<'_>, site_directory: &str, repository_url: &str) -> Result<()> {
    eprintln!("Pulling changes...");
    let pull = staging
        .start_session()
        .add(format!("cd {site_directory}"))
        .add(git::fetch("--all"))
        .add(git::reset("--hard", &format!("origin/{STAGING_BRANCH}")));
    let command = pull.command_line();
    let attempt = pull.try_execute()?;
    if attempt.success {
        return Ok(());
    }
    if !attempt.output.to_lowercase().contains(NOT_A_REPOSITORY) {
        return Err(Error::CommandFailed {
            command,
            message: attempt.output.trim().to_string(),
        });
    }

    step("Setting up repository", || {
        staging
            .start_session()
            .add(format!("cd {site_directory}"))
            .add("rm -rf public/")
            .add(git::clone(repository_url, Some(".")))
            .add(git::checkout(STAGING_BRANCH))
            .execute()
    })?;
    Ok(())
}

/// Creates the project database and account when missing. Copying data in
/// is left to `dirt transfer:db`.
fn synchronize_database(staging: &Terminal<'_>, credentials: &DatabaseCredentials) -> Result<()> {
    let admin = mysql_admin(staging.profile(), &Environment::Staging)?;
    let database = Database::new(staging, MySql::new(&admin.username, &admin.password));

    let exists = step("Checking if database has been configured", || {
        database.exists(&credentials.database)
    })?;
    if exists {
        return Ok(());
    }

    step("\tConfiguring database account on staging server", || {
        database.create(credentials)
    })?;
    eprintln!();
    eprintln!("The staging database is empty. Copy the dev database with:");
    eprintln!("    dirt transfer:db dev staging");
    Ok(())
}
