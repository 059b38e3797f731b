//! Project file templates with `__PLACEHOLDER__` substitution.
//!
//! Each template ships inside the binary. A team can override any of them by
//! putting a file with the same name in `templates_dir`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Configuration;
use crate::environment::Environment;
use crate::error::Result;
use crate::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Readme,
    Gitignore,
    Vagrantfile,
    StagingVhost,
}

impl Template {
    /// Name of the template file, also used for team overrides.
    pub fn file_name(self) -> &'static str {
        match self {
            Template::Readme => "README.md",
            Template::Gitignore => "gitignore",
            Template::Vagrantfile => "Vagrantfile",
            Template::StagingVhost => "staging_vhost.conf",
        }
    }

    /// Name of the file written into a project.
    pub fn output_name(self) -> &'static str {
        match self {
            Template::Gitignore => ".gitignore",
            other => other.file_name(),
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            Template::Readme => include_str!("../templates/README.md"),
            Template::Gitignore => include_str!("../templates/gitignore"),
            Template::Vagrantfile => include_str!("../templates/Vagrantfile"),
            Template::StagingVhost => include_str!("../templates/staging_vhost.conf"),
        }
    }
}

/// Placeholder values, applied in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Variables(Vec<(&'static str, String)>);

impl Variables {
    /// The standard placeholders of a project. Generates the dev database
    /// credentials if the project has none yet.
    pub fn for_project(project: &mut Project) -> Result<Self> {
        let credentials = project.database_credentials(&Environment::Dev)?;
        Ok(Self::default()
            .set("__PROJECT_NAME_SIMPLE__", project.name.clone())
            .set("__PROJECT_NAME__", project.name_full.clone())
            .set(
                "__PROJECT_DESCRIPTION__",
                project.description.clone().unwrap_or_default(),
            )
            .set("__DEV_URL__", project.urls.dev.clone())
            .set("__STAGING_URL__", project.urls.staging.clone())
            .set("__DATABASE_USERNAME__", credentials.username)
            .set("__DATABASE_PASSWORD__", credentials.password)
            .set("__DATABASE_NAME__", credentials.database)
            .set("__IPADDRESS__", project.ip_address.clone()))
    }

    /// Adds or replaces a placeholder.
    pub fn set(mut self, placeholder: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.0.iter_mut().find(|(name, _)| *name == placeholder) {
            Some(slot) => slot.1 = value,
            None => self.0.push((placeholder, value)),
        }
        self
    }

    pub fn apply(&self, text: &str) -> String {
        self.0
            .iter()
            .fold(text.to_string(), |acc, (placeholder, value)| {
                acc.replace(placeholder, value)
            })
    }
}

/// Resolves templates against an optional override directory.
pub struct Templates {
    override_dir: Option<PathBuf>,
}

impl Templates {
    pub fn new(config: &Configuration) -> Self {
        Self {
            override_dir: config.templates_dir.clone(),
        }
    }

    /// Raw template text: the team's copy if it has one, else the builtin.
    pub fn source(&self, template: Template) -> Result<String> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(template.file_name());
            if path.is_file() {
                debug!("using team template {}", path.display());
                return Ok(std::fs::read_to_string(path)?);
            }
        }
        Ok(template.builtin().to_string())
    }

    pub fn render(&self, template: Template, variables: &Variables) -> Result<String> {
        Ok(variables.apply(&self.source(template)?))
    }

    /// Renders `template` into `directory`, returning the written path.
    pub fn write(
        &self,
        template: Template,
        variables: &Variables,
        directory: &Path,
    ) -> Result<PathBuf> {
        let path = directory.join(template.output_name());
        std::fs::write(&path, self.render(template, variables)?)?;
        Ok(path)
    }
}
