//! `dirt deploy <environment>`: deploys or undeploys the current project.

use tracing::info;

use crate::config::Configuration;
use crate::environment::Environment;
use crate::error::Result;
use crate::project::Project;
use crate::prompt::Prompt;
use crate::runner::CommandRunner;
use crate::sync::{DeployOptions, Synchronizer};

pub fn run(
    runner: &dyn CommandRunner,
    config: &Configuration,
    prompt: &dyn Prompt,
    project: &mut Project,
    environment: &Environment,
    undeploy: bool,
    options: &DeployOptions,
) -> Result<()> {
    let mut synchronizer = Synchronizer::new(runner, config, prompt);
    if undeploy {
        info!("undeploying {} from {environment}", project.name);
        synchronizer.undeploy(project, environment)
    } else {
        info!("deploying {} to {environment}", project.name);
        synchronizer.deploy(project, environment, options)
    }
}
