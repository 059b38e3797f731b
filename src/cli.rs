//! The `dirt` command line, declared with clap's derive API.
//!
//! Environment arguments stay strings until `main` parses them, so a bad
//! token is reported like every other validation error.

use clap::{Parser, Subcommand};

/// Create, deploy and move web projects between dev, staging and production.
#[derive(Debug, Parser)]
#[command(name = "dirt", version)]
pub struct Cli {
    /// Increase log verbosity (-v = INFO, -vv = DEBUG, -vvv = TRACE).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Maps the verbosity count to a tracing filter level.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new project in the current directory.
    Create {
        /// Full project name; the directory uses its simple form.
        name: String,

        /// Framework to configure the project for (wordpress/wp, laravel/l5).
        #[arg(short, long)]
        framework: Option<String>,

        /// Project description.
        #[arg(short, long)]
        description: Option<String>,

        /// Do not create a hosted repository.
        #[arg(long)]
        skip_repository: bool,
    },

    /// Deploy the project to an environment.
    Deploy {
        /// staging/s, production/p, wpengine/w or branch[:<ref>].
        environment: String,

        /// Remove the deployment instead.
        #[arg(long)]
        undeploy: bool,

        /// Answer yes to every confirmation.
        #[arg(short, long)]
        yes: bool,

        /// Do not offer to open the site afterwards.
        #[arg(long)]
        no_prompt: bool,
    },

    /// Regenerate the Vagrantfile and reconfigure the dev environment.
    Apply,

    /// Transfer the database and uploads between environments.
    Transfer {
        /// development/dev/d, staging/stage/s or production/prod/p.
        source: String,
        /// development/dev/d, staging/stage/s or production/prod/p.
        destination: String,

        /// Answer yes to every confirmation.
        #[arg(short, long)]
        yes: bool,

        /// Import the dump without rewriting site URLs.
        #[arg(long)]
        skip_migration: bool,
    },

    /// Transfer a database dump between environments.
    #[command(name = "transfer:db")]
    TransferDb {
        /// development/dev/d, staging/stage/s or production/prod/p.
        source: String,
        /// development/dev/d, staging/stage/s or production/prod/p.
        destination: String,

        /// Answer yes to every confirmation.
        #[arg(short, long)]
        yes: bool,

        /// Import the dump without rewriting site URLs.
        #[arg(long)]
        skip_migration: bool,
    },

    /// Transfer uploaded files between environments.
    #[command(name = "transfer:uploads")]
    TransferUploads {
        /// development/dev/d, staging/stage/s or production/prod/p.
        source: String,
        /// development/dev/d, staging/stage/s or production/prod/p.
        destination: String,

        /// Answer yes to every confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Seed the project with the starter theme and plugins repositories.
    Seed {
        /// Answer yes to every confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Create a branch, push it and switch to it.
    Branch {
        /// Branch name (lower-cased).
        name: String,

        /// Do not push the branch to origin.
        #[arg(long)]
        skip_repository: bool,
    },
}
