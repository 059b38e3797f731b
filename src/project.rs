//! The project manifest (`Dirtfile.json`) and the names derived from it.
//!
//! A project is created once by `dirt create` and then loaded from its root
//! directory by every other command. Database credentials are generated the
//! first time an environment needs them and persisted on the next
//! [`Project::save`].

use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Configuration;
use crate::discovery::MANIFEST_FILE;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::framework::{self, Framework};

/// MySQL limits user names to 16 characters.
const DATABASE_USERNAME_MAX: usize = 16;

const PASSWORD_LENGTH: usize = 12;

/// Where the project lives inside the dev VM.
pub const DEV_SITE_DIRECTORY: &str = "/vagrant";

/// Credentials of a project database in one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

fn default_hostname() -> String {
    "localhost".to_string()
}

/// Host names per environment, without protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Urls {
    pub dev: String,
    pub staging: String,
    pub production: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Databases {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev: Option<DatabaseCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging: Option<DatabaseCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<DatabaseCredentials>,
}

/// git-ftp settings for deploying to WP Engine.
///
/// The keys are upper-case in the manifest and the port is kept as a string,
/// both as written by earlier releases of the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WpEngineSettings {
    #[serde(rename = "FTP_USER")]
    pub user: String,
    #[serde(rename = "FTP_PASSWORD")]
    pub password: String,
    /// Host name of the WP Engine install.
    #[serde(rename = "FTP_URL")]
    pub host: String,
    #[serde(rename = "FTP_PROTOCOL", default = "default_ftp_protocol")]
    pub protocol: String,
    #[serde(rename = "FTP_PORT", default = "default_ftp_port")]
    pub port: String,
    /// Folder on the install that receives the files.
    #[serde(rename = "FTP_REMOTE_FOLDER", default = "default_remote_folder")]
    pub remote_folder: String,
    /// Project folder whose tracked files are uploaded.
    #[serde(rename = "LOCAL_DIRECTORY_TO_SYNC", default = "default_sync_root")]
    pub sync_root: String,
}

fn default_ftp_protocol() -> String {
    "sftp".to_string()
}

fn default_ftp_port() -> String {
    "2222".to_string()
}

fn default_remote_folder() -> String {
    "wp-content".to_string()
}

fn default_sync_root() -> String {
    "public/wp-content".to_string()
}

/// Starter repositories cloned into a project by `dirt seed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSources {
    /// Build tooling; recorded but not cloned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<String>,
}

/// The persisted project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub name_full: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Private address of the dev VM.
    #[serde(rename = "ipaddress", alias = "ip_address", default = "generate_ip_address")]
    pub ip_address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    #[serde(default)]
    pub urls: Urls,

    #[serde(default)]
    pub database: Databases,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wpengine: Option<WpEngineSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedSources>,

    /// The directory holding the manifest; not persisted.
    #[serde(skip)]
    directory: PathBuf,

    /// `origin` of the project's git repository; not persisted.
    #[serde(skip)]
    repository_url: Option<String>,
}

impl Project {
    /// A new project named `name_full`, living in `parent/<simple name>`.
    ///
    /// URLs are the lower-cased simple name plus each environment's domain
    /// suffix.
    pub fn new(name_full: &str, parent: &Path, config: &Configuration) -> Self {
        let name = simple_name(name_full);
        let url = |environment: Environment| {
            format!(
                "{}{}",
                name.to_lowercase(),
                config.domain_suffix(&environment)
            )
        };
        Self {
            urls: Urls {
                dev: url(Environment::Dev),
                staging: url(Environment::Staging),
                production: url(Environment::Production),
            },
            directory: parent.join(&name),
            name,
            name_full: name_full.to_string(),
            description: None,
            ip_address: generate_ip_address(),
            production_directory: None,
            framework: None,
            database: Databases::default(),
            wpengine: None,
            seed: None,
            repository_url: None,
        }
    }

    /// Loads `Dirtfile.json` from `directory`.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(MANIFEST_FILE);
        let contents = std::fs::read_to_string(&path).map_err(|e| Error::ManifestParse {
            reason: format!("{}: {e}", path.display()),
        })?;
        let mut project: Project =
            serde_json::from_str(&contents).map_err(|e| Error::ManifestParse {
                reason: e.to_string(),
            })?;
        project.directory = directory.to_path_buf();
        project.repository_url = read_origin_url(directory);
        debug!(
            "loaded project {} (repository {:?})",
            project.name, project.repository_url
        );
        Ok(project)
    }

    /// Writes the manifest, pretty-printed, to the project directory.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(self.manifest_path(), format!("{json}\n"))?;
        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(MANIFEST_FILE)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    pub fn set_repository_url(&mut self, url: impl Into<String>) {
        self.repository_url = Some(url.into());
    }

    /// The project's framework, if it declares one.
    pub fn framework(&self) -> Result<Option<&'static dyn Framework>> {
        match &self.framework {
            None => Ok(None),
            Some(name) => framework::find(name)
                .map(Some)
                .ok_or_else(|| Error::Validation(format!("unknown framework {name:?}"))),
        }
    }

    /// Uploads folder relative to the project root, when the framework has one.
    pub fn uploads_folder(&self) -> Result<Option<String>> {
        Ok(self
            .framework()?
            .and_then(|framework| framework.uploads_folder(&self.directory)))
    }

    /// Host name of the site in `environment`.
    pub fn url(&self, environment: &Environment) -> Result<&str> {
        match environment {
            Environment::Dev => Ok(&self.urls.dev),
            Environment::Staging => Ok(&self.urls.staging),
            Environment::Production => Ok(&self.urls.production),
            Environment::WpEngine => Err(Error::Validation(
                "the wpengine site URL is not kept in Dirtfile.json".to_string(),
            )),
            Environment::Branch(_) => Err(Error::Validation(
                "a branch has no URL of its own".to_string(),
            )),
        }
    }

    /// URL of the site in `environment`, with protocol.
    pub fn http_url(&self, environment: &Environment) -> Result<String> {
        Ok(format!("http://{}", self.url(environment)?))
    }

    /// Name of the web server vhost file for this project.
    pub fn vhost_name(&self) -> String {
        format!("site_{}.conf", self.name.to_lowercase())
    }

    /// Directory holding the site's files in `environment`.
    ///
    /// Fails before anything destructive can use it if the computed path
    /// would point at the shared sites root or somewhere outside it.
    pub fn site_directory(&self, environment: &Environment, config: &Configuration) -> Result<String> {
        match environment {
            Environment::Dev => Ok(DEV_SITE_DIRECTORY.to_string()),
            Environment::Staging => site_path(
                &config.environments.staging.webserver.sites_root,
                &self.urls.staging,
            ),
            Environment::Production => {
                let directory = self
                    .production_directory
                    .as_deref()
                    .map(|d| d.trim().trim_end_matches('/'))
                    .unwrap_or_default();
                if directory.is_empty() {
                    return Err(Error::Validation(
                        "production_directory is not set in Dirtfile.json".to_string(),
                    ));
                }
                Ok(directory.to_string())
            }
            Environment::WpEngine | Environment::Branch(_) => Err(Error::Validation(format!(
                "{} has no site directory",
                environment.name()
            ))),
        }
    }

    /// Database credentials for `environment`, generated on first use.
    pub fn database_credentials(&mut self, environment: &Environment) -> Result<DatabaseCredentials> {
        let generated = self.generate_database_credentials();
        let slot = match environment {
            Environment::Dev => &mut self.database.dev,
            Environment::Staging => &mut self.database.staging,
            Environment::Production => &mut self.database.production,
            Environment::WpEngine => {
                return Err(Error::Validation(
                    "the wpengine database is managed by wpengine".to_string(),
                ))
            }
            Environment::Branch(_) => {
                return Err(Error::Validation(
                    "a branch has no database of its own".to_string(),
                ))
            }
        };
        Ok(slot.get_or_insert(generated).clone())
    }

    /// Fresh credentials: the user name (and database name) come from the
    /// project name, the password is random.
    pub fn generate_database_credentials(&self) -> DatabaseCredentials {
        let username = database_username(&self.name);
        DatabaseCredentials {
            database: username.clone(),
            username,
            password: generate_password(PASSWORD_LENGTH),
            hostname: default_hostname(),
        }
    }
}

/// Derives the short project name: spaces become hyphens, anything outside
/// `[a-zA-Z0-9-]` is dropped, and leading/trailing hyphens are trimmed.
pub fn simple_name(name_full: &str) -> String {
    name_full
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// MySQL user name for a project.
pub fn database_username(name: &str) -> String {
    let username = name.to_lowercase().replace('-', "_");
    if username.chars().count() <= DATABASE_USERNAME_MAX {
        return username;
    }
    username
        .chars()
        .take(DATABASE_USERNAME_MAX)
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Joins the sites root and a site fragment, rejecting fragments that would
/// resolve to the root itself or escape it.
pub fn site_path(sites_root: &str, fragment: &str) -> Result<String> {
    let fragment = fragment.trim().trim_matches('/');
    if fragment.is_empty() || fragment == "." || fragment == ".." || fragment.contains('/') {
        return Err(Error::Validation(format!(
            "refusing to use site directory {fragment:?} under {sites_root}"
        )));
    }
    Ok(format!("{}/{fragment}", sites_root.trim_end_matches('/')))
}

fn generate_ip_address() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "172.{}.{}.{}",
        rng.gen_range(16..=31),
        rng.gen_range(0..=255),
        rng.gen_range(2..=255)
    )
}

fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Reads the `origin` URL from the project's `.git/config`.
fn read_origin_url(directory: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(directory.join(".git").join("config")).ok()?;
    parse_origin_url(&contents)
}

/// Extracts `url` from the `[remote "origin"]` section of a git config file.
pub fn parse_origin_url(git_config: &str) -> Option<String> {
    let mut in_origin = false;
    for line in git_config.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_origin = line == "[remote \"origin\"]";
            continue;
        }
        if !in_origin {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "url" {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
pub(crate) fn test_project(directory: &Path) -> Project {
    let mut project = Project::new("New Test Project", Path::new("/"), &crate::config::test_config());
    project.directory = directory.to_path_buf();
    project.repository_url = Some("git@github.com:acme/new-test-project.git".to_string());
    project
}
