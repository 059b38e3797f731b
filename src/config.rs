//! Two-tier configuration: a team file merged with the user's local file.
//!
//! Both files are TOML. The team file (optional) is loaded first and the local
//! file (`~/.dirt.toml`, required) is deep-merged over it key by key, so a user
//! only needs to override what differs from the team defaults. The merged tree
//! is then deserialized into [`Configuration`]; a missing required field fails
//! here rather than at first use. Unknown keys are silently ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml::{Table, Value};

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::project::SeedSources;

/// Environment variable overriding the local configuration path.
pub const LOCAL_CONFIG_ENV: &str = "DIRT_CONFIG";

/// Environment variable overriding the team configuration path.
pub const TEAM_CONFIG_ENV: &str = "DIRT_TEAM_CONFIG";

/// Deserialized, merged configuration. Constructed once in `main` and passed
/// by reference to everything that needs it.
#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    #[serde(default = "default_primary_branch")]
    pub primary_branch: String,

    /// Directory whose files override the built-in project templates.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,

    pub environments: Environments,

    #[serde(default)]
    pub scm: Option<ScmConfig>,

    /// Team starter repositories for `dirt seed`.
    #[serde(default)]
    pub seed: TeamSeed,
}

/// Starter repositories per framework.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamSeed {
    pub wordpress: SeedSources,
    pub laravel: SeedSources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Environments {
    #[serde(default)]
    pub dev: DevEnvironment,
    pub staging: ServerEnvironment,
    pub production: ServerEnvironment,
}

/// The dev environment is a local VM; its connection details are queried
/// from vagrant at connect time, so only the domain suffix is configured.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevEnvironment {
    #[serde(default)]
    pub domain_suffix: Option<String>,
}

/// A staging or production server reachable over SSH.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEnvironment {
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    /// Private key used for public-key authentication. `~/` is expanded.
    pub keyfile: String,

    /// Administrative MySQL account used to create and drop project databases.
    #[serde(default)]
    pub mysql: Option<MysqlAdmin>,

    #[serde(default)]
    pub domain_suffix: Option<String>,

    #[serde(default)]
    pub webserver: WebServer,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MysqlAdmin {
    pub username: String,
    pub password: String,
}

/// Web server layout and control commands on a server environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebServer {
    pub vhost_dir: String,
    pub sites_root: String,
    pub group: String,
    pub configtest: String,
    pub reload: String,
}

impl Default for WebServer {
    fn default() -> Self {
        Self {
            vhost_dir: "/etc/httpd/sites-enabled".to_string(),
            sites_root: "/var/www/sites".to_string(),
            group: "webdata".to_string(),
            configtest: "sudo /etc/init.d/httpd configtest".to_string(),
            reload: "sudo /etc/init.d/httpd graceful".to_string(),
        }
    }
}

/// Version-control hosting account, selected by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScmConfig {
    Github {
        username: String,
        password: String,
        #[serde(default)]
        organization: Option<String>,
    },
    Gitlab {
        domain: String,
        private_token: String,
        #[serde(default)]
        group_id: Option<u64>,
    },
}

fn default_primary_branch() -> String {
    "master".to_string()
}

fn default_port() -> u16 {
    22
}

impl Configuration {
    /// Parses a single, already merged configuration document.
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_layers(None, input)
    }

    /// Merges the local document over the team document and deserializes
    /// the result.
    pub fn from_layers(team: Option<&str>, local: &str) -> Result<Self> {
        let mut merged = match team {
            Some(team) => parse_table(team)?,
            None => Value::Table(Table::new()),
        };
        merge_values(&mut merged, parse_table(local)?);
        merged.try_into().map_err(|e: toml::de::Error| Error::ConfigParse {
            reason: e.to_string(),
        })
    }

    /// Loads the configuration from the standard locations.
    ///
    /// The local file is required; the team file is used when present.
    pub fn load() -> Result<Self> {
        let local_path = local_config_path()?;
        let local = read_config(&local_path)?;
        let team = match team_config_path() {
            Some(path) if path.is_file() => Some(read_config(&path)?),
            _ => None,
        };
        Self::from_layers(team.as_deref(), &local)
    }

    /// The team's starter repositories for `framework`.
    pub fn team_seed(&self, framework: &str) -> Option<&SeedSources> {
        match framework {
            "wordpress" => Some(&self.seed.wordpress),
            "laravel" => Some(&self.seed.laravel),
            _ => None,
        }
    }

    /// Returns the record for a server environment.
    pub fn server(&self, environment: &Environment) -> Result<&ServerEnvironment> {
        match environment {
            Environment::Staging => Ok(&self.environments.staging),
            Environment::Production => Ok(&self.environments.production),
            other => Err(Error::Validation(format!(
                "{other} is not a server environment"
            ))),
        }
    }

    /// Domain suffix appended to the project name to build its URL.
    pub fn domain_suffix(&self, environment: &Environment) -> &str {
        let suffix = match environment {
            Environment::Dev => self.environments.dev.domain_suffix.as_deref(),
            Environment::Staging => self.environments.staging.domain_suffix.as_deref(),
            Environment::Production => self.environments.production.domain_suffix.as_deref(),
            Environment::WpEngine | Environment::Branch(_) => None,
        };
        suffix.unwrap_or_default()
    }
}

fn parse_table(input: &str) -> Result<Value> {
    let table: Table = toml::from_str(input).map_err(|e| Error::ConfigParse {
        reason: e.to_string(),
    })?;
    Ok(Value::Table(table))
}

fn read_config(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Recursively merges `overlay` into `base`. Tables merge key by key; any
/// other value in `overlay` replaces the one in `base`.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// `$DIRT_CONFIG`, else `~/.dirt.toml`.
pub fn local_config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(LOCAL_CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(".dirt.toml"))
        .ok_or_else(|| Error::ConfigParse {
            reason: "cannot determine home directory".to_string(),
        })
}

/// `$DIRT_TEAM_CONFIG`, else `<config dir>/dirt/team.toml`.
pub fn team_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(TEAM_CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("dirt").join("team.toml"))
}

#[cfg(test)]
pub(crate) fn test_config() -> Configuration {
    Configuration::parse(
        r#"
[environments.dev]
domain_suffix = ".local"

[environments.staging]
hostname = "staging.example.com"
username = "deploy"
keyfile = "/home/me/.ssh/id_rsa"
domain_suffix = ".staging.example.com"

[environments.staging.mysql]
username = "root"
password = "secret"

[environments.production]
hostname = "prod.example.com"
port = 2222
username = "deploy"
keyfile = "/home/me/.ssh/id_rsa"
domain_suffix = ".com"

[environments.production.mysql]
username = "root"
password = "topsecret"
"#,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEAM: &str = r#"
primary_branch = "main"

[environments.dev]
domain_suffix = ".dev"

[environments.staging]
hostname = "staging.team.com"
username = "team"
keyfile = "~/.ssh/team"

[environments.production]
hostname = "prod.team.com"
username = "team"
keyfile = "~/.ssh/team"
"#;

    #[test]
    fn minimal_config() {
        let config = test_config();
        assert_eq!(config.primary_branch, "master");
        assert_eq!(config.environments.staging.port, 22);
        assert_eq!(config.environments.production.port, 2222);
        assert!(config.scm.is_none());
        assert!(config.templates_dir.is_none());
    }

    #[test]
    fn webserver_defaults() {
        let config = test_config();
        let web = &config.environments.staging.webserver;
        assert_eq!(web.vhost_dir, "/etc/httpd/sites-enabled");
        assert_eq!(web.sites_root, "/var/www/sites");
        assert_eq!(web.group, "webdata");
        assert_eq!(web.reload, "sudo /etc/init.d/httpd graceful");
    }

    #[test]
    fn local_overrides_team() {
        let local = r#"
[environments.dev]
domain_suffix = ".local"

[environments.staging]
username = "me"
"#;
        let config = Configuration::from_layers(Some(TEAM), local).unwrap();
        assert_eq!(config.environments.dev.domain_suffix.as_deref(), Some(".local"));
        assert_eq!(config.environments.staging.username, "me");
        // Untouched keys keep the team value
        assert_eq!(config.environments.staging.hostname, "staging.team.com");
        assert_eq!(config.primary_branch, "main");
    }

    #[test]
    fn team_seed_merges_with_local_override() {
        let team = format!(
            "{TEAM}\n[seed.wordpress]\ntheme = \"git@github.com:team/theme.git\"\nplugins = \"git@github.com:team/plugins.git\"\n"
        );
        let local = "[seed.wordpress]\ntheme = \"git@github.com:me/theme.git\"\n";
        let config = Configuration::from_layers(Some(&team), local).unwrap();

        let wordpress = config.team_seed("wordpress").unwrap();
        assert_eq!(wordpress.theme.as_deref(), Some("git@github.com:me/theme.git"));
        assert_eq!(wordpress.plugins.as_deref(), Some("git@github.com:team/plugins.git"));
        assert_eq!(config.team_seed("laravel"), Some(&SeedSources::default()));
        assert!(config.team_seed("drupal").is_none());
        assert_eq!(test_config().seed.wordpress, SeedSources::default());
    }

    #[test]
    fn missing_server_environment() {
        let err = Configuration::from_layers(None, "[environments.dev]\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn missing_required_field_fails_at_load() {
        let local = r#"
[environments.staging]
hostname = "h"
username = "u"

[environments.production]
hostname = "h"
username = "u"
keyfile = "k"
"#;
        let err = Configuration::parse(local).unwrap_err();
        assert!(err.to_string().contains("keyfile"));
    }

    #[test]
    fn invalid_toml() {
        let err = Configuration::parse("not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn unknown_keys_ignored() {
        let local = format!("{TEAM}\nsome_future_field = true\n");
        assert!(Configuration::parse(&local).is_ok());
    }

    #[test]
    fn scm_github() {
        let local = format!(
            "{TEAM}\n[scm]\ntype = \"github\"\nusername = \"u\"\npassword = \"p\"\norganization = \"acme\"\n"
        );
        let config = Configuration::parse(&local).unwrap();
        match config.scm {
            Some(ScmConfig::Github { organization, .. }) => {
                assert_eq!(organization.as_deref(), Some("acme"))
            }
            other => panic!("expected github, got {other:?}"),
        }
    }

    #[test]
    fn scm_gitlab() {
        let local = format!(
            "{TEAM}\n[scm]\ntype = \"gitlab\"\ndomain = \"git.acme.com\"\nprivate_token = \"t\"\ngroup_id = 7\n"
        );
        let config = Configuration::parse(&local).unwrap();
        match config.scm {
            Some(ScmConfig::Gitlab { domain, group_id, .. }) => {
                assert_eq!(domain, "git.acme.com");
                assert_eq!(group_id, Some(7));
            }
            other => panic!("expected gitlab, got {other:?}"),
        }
    }

    #[test]
    fn merge_replaces_scalars_and_merges_tables() {
        let mut base: Value = Value::Table(toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap());
        let overlay = Value::Table(toml::from_str("a = 2\n[t]\ny = 3\n").unwrap());
        merge_values(&mut base, overlay);
        assert_eq!(base["a"].as_integer(), Some(2));
        assert_eq!(base["t"]["x"].as_integer(), Some(1));
        assert_eq!(base["t"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn server_lookup() {
        let config = test_config();
        assert_eq!(
            config.server(&Environment::Production).unwrap().hostname,
            "prod.example.com"
        );
        assert!(matches!(
            config.server(&Environment::Dev),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn domain_suffix_per_environment() {
        let config = test_config();
        assert_eq!(config.domain_suffix(&Environment::Dev), ".local");
        assert_eq!(config.domain_suffix(&Environment::Production), ".com");
        assert_eq!(config.domain_suffix(&Environment::Branch(None)), "");
    }

    #[test]
    fn missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }
}
