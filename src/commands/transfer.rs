//! `dirt transfer`, `dirt transfer:db` and `dirt transfer:uploads`.

use crate::config::Configuration;
use crate::environment::Environment;
use crate::error::Result;
use crate::project::Project;
use crate::prompt::Prompt;
use crate::runner::CommandRunner;
use crate::sync::{Synchronizer, TransferOptions};

pub fn database(
    runner: &dyn CommandRunner,
    config: &Configuration,
    prompt: &dyn Prompt,
    project: &mut Project,
    source: &Environment,
    destination: &Environment,
    options: &TransferOptions,
) -> Result<()> {
    Synchronizer::new(runner, config, prompt).transfer_database(
        project,
        source,
        destination,
        options,
    )
}

pub fn uploads(
    runner: &dyn CommandRunner,
    config: &Configuration,
    prompt: &dyn Prompt,
    project: &mut Project,
    source: &Environment,
    destination: &Environment,
) -> Result<()> {
    Synchronizer::new(runner, config, prompt).transfer_uploads(project, source, destination)
}

/// The database, then the uploads. Projects without an uploads folder
/// only transfer their database.
pub fn run(
    runner: &dyn CommandRunner,
    config: &Configuration,
    prompt: &dyn Prompt,
    project: &mut Project,
    source: &Environment,
    destination: &Environment,
    options: &TransferOptions,
) -> Result<()> {
    let mut synchronizer = Synchronizer::new(runner, config, prompt);
    synchronizer.transfer_database(project, source, destination, options)?;
    eprintln!();
    if project.uploads_folder()?.is_none() {
        eprintln!("No uploads folder in {}, skipping uploads", project.name);
        return Ok(());
    }
    synchronizer.transfer_uploads(project, source, destination)
}
