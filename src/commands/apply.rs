//! `dirt apply`: brings an existing project's dev setup up to date.
//!
//! Regenerates the Vagrantfile from the current template and reruns the
//! framework's dev hook. Run it after installing the framework into a fresh
//! project or after the templates changed.

use crate::config::Configuration;
use crate::environment::Environment;
use crate::error::Result;
use crate::framework::Site;
use crate::output::step;
use crate::project::Project;
use crate::prompt::Prompt;
use crate::runner::CommandRunner;
use crate::sync::configure_framework;
use crate::template::{Template, Templates, Variables};
use crate::terminal::Terminal;

/// Provisioning file of an older VM setup.
const BERKSFILE: &str = "Berksfile";

pub fn run(
    runner: &dyn CommandRunner,
    config: &Configuration,
    prompt: &dyn Prompt,
    project: &mut Project,
) -> Result<()> {
    let variables = Variables::for_project(project)?;
    // Picks up generated credentials and any manifest format changes
    project.save()?;

    let vagrantfile = project.directory().join(Template::Vagrantfile.output_name());
    if vagrantfile.exists()
        && !prompt.confirm(
            "Warning! This will overwrite the existing Vagrantfile, do you want to continue?",
            false,
        )?
    {
        eprintln!("Aborted.");
        return Ok(());
    }
    step("Updating Vagrantfile", || {
        Templates::new(config).write(Template::Vagrantfile, &variables, project.directory())
    })?;

    let berksfile = project.directory().join(BERKSFILE);
    if berksfile.exists() {
        step("Deleting Berksfile as it is no longer necessary", || {
            std::fs::remove_file(&berksfile)?;
            Ok(())
        })?;
    }

    if let Some(framework) = project.framework()? {
        let local = Terminal::local(runner, project.directory());
        let site = Site {
            terminal: &local,
            directory: project.directory().display().to_string(),
        };
        configure_framework(framework, &Environment::Dev, project, &site)?;
    }
    Ok(())
}
