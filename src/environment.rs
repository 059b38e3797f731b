//! Deployment targets and parsing of environment tokens from the command line.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const VALID_ENVIRONMENTS: &str =
    "development/dev/d, staging/stage/s, production/prod/p, wpengine/w or branch[:<ref>]";

/// A deployment target.
///
/// `Branch` targets a git ref rather than a host: `None` means the ref that is
/// currently checked out. `WpEngine` is a hosted WordPress install reached
/// over git-ftp, not a configured server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Production,
    WpEngine,
    Branch(Option<String>),
}

impl Environment {
    /// Short name used in manifests, URLs and framework hooks.
    pub fn name(&self) -> &str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::WpEngine => "wpengine",
            Environment::Branch(_) => "branch",
        }
    }

    /// Whether the environment is a configured server (staging or production).
    pub fn is_server(&self) -> bool {
        matches!(self, Environment::Staging | Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Branch(Some(reference)) => write!(f, "branch:{reference}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    /// Environments are recognised by their first letter, so `d`, `dev` and
    /// `development` all name the dev environment.
    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim();
        let lower = token.to_lowercase();

        if lower == "branch" {
            return Ok(Environment::Branch(None));
        }
        if let Some(reference) = lower.strip_prefix("branch:") {
            if reference.is_empty() {
                return Err(Error::Validation(
                    "branch environment needs a ref after `branch:`".to_string(),
                ));
            }
            // Refs are case sensitive, keep the original spelling
            return Ok(Environment::Branch(Some(token["branch:".len()..].to_string())));
        }

        match lower.chars().next() {
            Some('d') => Ok(Environment::Dev),
            Some('s') => Ok(Environment::Staging),
            Some('p') => Ok(Environment::Production),
            Some('w') => Ok(Environment::WpEngine),
            Some(_) => Err(Error::Validation(format!(
                "invalid environment {token:?}, valid environments are {VALID_ENVIRONMENTS}"
            ))),
            None => Err(Error::Validation(format!(
                "please specify an environment: {VALID_ENVIRONMENTS}"
            ))),
        }
    }
}
