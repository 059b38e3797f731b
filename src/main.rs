mod cli;

use std::path::Path;

use clap::Parser;
use cli::{Cli, Command};
use dirt::commands::{self, create::CreateOptions};
use dirt::config::Configuration;
use dirt::discovery;
use dirt::environment::Environment;
use dirt::error::Result;
use dirt::project::Project;
use dirt::prompt::{AssumeYes, Prompt, TerminalPrompt};
use dirt::runner::ProcessRunner;
use dirt::sync::{DeployOptions, TransferOptions};
use tracing_subscriber::FmtSubscriber;

/// Loads `Dirtfile.json` from `dir`.
fn load_project(dir: &Path) -> Result<Project> {
    let root = discovery::find_project_root(dir)?;
    Project::load(&root)
}

fn prompt_for(yes: bool) -> &'static dyn Prompt {
    if yes {
        &AssumeYes
    } else {
        &TerminalPrompt
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let runner = ProcessRunner::new();

    match cli.command {
        Command::Create {
            name,
            framework,
            description,
            skip_repository,
        } => {
            let config = Configuration::load()?;
            let host = commands::create::repository_host(&config, skip_repository)?;
            let options = CreateOptions {
                name,
                framework,
                description,
            };
            commands::create::run(&runner, &config, host.as_deref(), &cwd, &options)?;
        }
        Command::Deploy {
            environment,
            undeploy,
            yes,
            no_prompt,
        } => {
            let environment: Environment = environment.parse()?;
            let config = Configuration::load()?;
            let mut project = load_project(&cwd)?;
            commands::deploy::run(
                &runner,
                &config,
                prompt_for(yes),
                &mut project,
                &environment,
                undeploy,
                &DeployOptions { no_prompt },
            )?;
        }
        Command::Apply => {
            let config = Configuration::load()?;
            let mut project = load_project(&cwd)?;
            commands::apply::run(&runner, &config, &TerminalPrompt, &mut project)?;
        }
        Command::Transfer {
            source,
            destination,
            yes,
            skip_migration,
        } => {
            let source: Environment = source.parse()?;
            let destination: Environment = destination.parse()?;
            let config = Configuration::load()?;
            let mut project = load_project(&cwd)?;
            commands::transfer::run(
                &runner,
                &config,
                prompt_for(yes),
                &mut project,
                &source,
                &destination,
                &TransferOptions { skip_migration },
            )?;
        }
        Command::TransferDb {
            source,
            destination,
            yes,
            skip_migration,
        } => {
            let source: Environment = source.parse()?;
            let destination: Environment = destination.parse()?;
            let config = Configuration::load()?;
            let mut project = load_project(&cwd)?;
            commands::transfer::database(
                &runner,
                &config,
                prompt_for(yes),
                &mut project,
                &source,
                &destination,
                &TransferOptions { skip_migration },
            )?;
        }
        Command::TransferUploads {
            source,
            destination,
            yes,
        } => {
            let source: Environment = source.parse()?;
            let destination: Environment = destination.parse()?;
            let config = Configuration::load()?;
            let mut project = load_project(&cwd)?;
            commands::transfer::uploads(
                &runner,
                &config,
                prompt_for(yes),
                &mut project,
                &source,
                &destination,
            )?;
        }
        Command::Seed { yes } => {
            let config = Configuration::load()?;
            let project = load_project(&cwd)?;
            commands::seed::run(&runner, &config, prompt_for(yes), &project)?;
        }
        Command::Branch {
            name,
            skip_repository,
        } => {
            let root = discovery::find_project_root(&cwd)?;
            commands::branch::run(&runner, &root, &name, skip_repository)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
