//! Connection profiles: everything needed to open a remote session to a host.
//!
//! Staging and production profiles come from the configuration. The dev
//! profile is queried from vagrant at connect time since the VM's forwarded
//! port and generated key are not known in advance.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::config::{MysqlAdmin, ServerEnvironment};
use crate::error::{Error, Result};
use crate::runner::CommandRunner;

/// Host, port and credentials for a remote session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub keyfile: String,
    pub mysql: Option<MysqlAdmin>,
}

impl ConnectionProfile {
    /// `user@host`, the ssh destination.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.hostname)
    }

    /// Builds the profile of a configured server environment.
    pub fn from_server(server: &ServerEnvironment) -> Self {
        Self {
            hostname: server.hostname.clone(),
            port: server.port,
            username: server.username.clone(),
            keyfile: expand_home(&server.keyfile),
            mysql: server.mysql.clone(),
        }
    }

    /// Queries `vagrant ssh-config` in the project directory.
    pub fn from_vagrant(runner: &dyn CommandRunner, project_dir: &Path) -> Result<Self> {
        let output = runner.run_local(project_dir, "vagrant ssh-config")?;
        if !output.status.success() {
            return Err(Error::Validation(format!(
                "could not read the dev VM's ssh configuration, run `vagrant up` first: {}",
                output.stderr.trim()
            )));
        }
        let profile = parse_vagrant_ssh_config(&output.stdout)?;
        debug!(
            "dev VM reachable at {}:{}",
            profile.destination(),
            profile.port
        );
        Ok(profile)
    }
}

/// Parses the output of `vagrant ssh-config`.
///
/// Each line is `Key value`; values may be wrapped in double quotes.
pub fn parse_vagrant_ssh_config(output: &str) -> Result<ConnectionProfile> {
    let mut entries: HashMap<&str, &str> = HashMap::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        entries
            .entry(key)
            .or_insert_with(|| value.trim().trim_matches('"'));
    }

    let field = |key: &str| -> Result<String> {
        entries
            .get(key)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
            .ok_or_else(|| {
                Error::Validation(format!("vagrant ssh-config output is missing {key}"))
            })
    };

    let port = field("Port")?;
    Ok(ConnectionProfile {
        hostname: field("HostName")?,
        port: port
            .parse()
            .map_err(|_| Error::Validation(format!("invalid port in vagrant ssh-config: {port}")))?,
        username: field("User")?,
        keyfile: field("IdentityFile")?,
        mysql: None,
    })
}

/// Expands a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).display().to_string(),
        _ => path.to_string(),
    }
}

#[cfg(test)]
pub(crate) fn test_profile() -> ConnectionProfile {
    ConnectionProfile {
        hostname: "staging.example.com".to_string(),
        port: 22,
        username: "deploy".to_string(),
        keyfile: "/home/me/.ssh/id_rsa".to_string(),
        mysql: Some(MysqlAdmin {
            username: "root".to_string(),
            password: "secret".to_string(),
        }),
    }
}
