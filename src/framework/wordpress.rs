use std::path::Path;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

use super::{Framework, Site};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::project::{DatabaseCredentials, Project};
use crate::remote;

const UPLOADS_FOLDER: &str = "public/wp-content/uploads";

/// Placeholder wordpress ships in place of its authentication salts.
const SALT_PLACEHOLDER: &str = "put your unique phrase here";

const HEADER: [&str; 7] = [
    "/**********************************************************************",
    " * WARNING",
    " * This file is automatically generated by dirt!",
    " * You should never edit this file manually unless you understand the",
    " * implications.",
    " *********************************************************************/",
    "",
];

pub struct WordPress;

impl Framework for WordPress {
    fn name(&self) -> &'static str {
        "wordpress"
    }

    fn shortcuts(&self) -> &'static [&'static str] {
        &["wp"]
    }

    fn uploads_folder(&self, _project_dir: &Path) -> Option<String> {
        Some(UPLOADS_FOLDER.to_string())
    }

    /// Renders `wp-config.php` for the environment from the project's local
    /// copy: the sample config for dev, the generated config otherwise.
    fn configure_environment(
        &self,
        environment: &Environment,
        project: &mut Project,
        site: &Site<'_, '_>,
    ) -> Result<()> {
        if matches!(environment, Environment::WpEngine | Environment::Branch(_)) {
            return Ok(());
        }

        let source = match environment {
            Environment::Dev => "wp-config-sample.php",
            _ => "wp-config.php",
        };
        // Either the project root holds wordpress (core in a subdirectory)
        // or it lives entirely in public/
        let config_dir = if project.directory().join(source).is_file() {
            ""
        } else if project.directory().join("public").join(source).is_file() {
            "public/"
        } else {
            return Err(Error::Framework {
                framework: self.name().to_string(),
                message: format!("could not find {source}"),
            });
        };

        let template = std::fs::read_to_string(project.directory().join(config_dir).join(source))?;
        let credentials = project.database_credentials(environment)?;
        let url = project.http_url(environment)?;
        let prefix = table_prefix(&project.name);
        let settings = ConfigSettings {
            debug: *environment == Environment::Dev,
            credentials: &credentials,
            url: &url,
            table_prefix: &prefix,
            core_in_subdirectory: config_dir.is_empty(),
        };
        let mut rendered = render_config(&template, &settings);

        info!("writing wp-config.php for {environment}");
        if *environment == Environment::Dev {
            while rendered.contains(SALT_PLACEHOLDER) {
                rendered = rendered.replacen(SALT_PLACEHOLDER, &generate_salt(), 1);
            }
            std::fs::write(
                project.directory().join(config_dir).join("wp-config.php"),
                rendered,
            )?;
            return Ok(());
        }

        let target = format!("{}/{config_dir}wp-config.php", site.directory);
        site.terminal.run(&remote::write_file(&target, &rendered))?;

        if *environment == Environment::Production {
            site.terminal
                .start_session()
                .add(format!("cd {}", site.directory))
                .add("ln -sf public html")
                .add("chmod -R 777 public/wp-content")
                .execute()?;
        }
        Ok(())
    }
}

struct ConfigSettings<'a> {
    debug: bool,
    credentials: &'a DatabaseCredentials,
    url: &'a str,
    table_prefix: &'a str,
    core_in_subdirectory: bool,
}

/// `eng` plus the first three letters of the project name.
fn table_prefix(name: &str) -> String {
    let letters: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect();
    format!("eng{letters}_")
}

fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

fn define(name: &str, value: &str) -> String {
    format!("define('{name}', '{value}');")
}

/// Rewrites the settings lines of a wp-config file.
///
/// The `WP_HOME`/`WP_SITEURL` block is inserted after the `WP_DEBUG` line
/// when the source does not define both yet.
fn render_config(template: &str, settings: &ConfigSettings<'_>) -> String {
    let site_url = if settings.core_in_subdirectory {
        format!("{}/core", settings.url)
    } else {
        settings.url.to_string()
    };

    let mut lines: Vec<String> = Vec::new();
    let mut debug_line = None;
    let mut home_found = false;
    let mut siteurl_found = false;

    for line in template.lines() {
        let rewritten = if line.contains("define('DB_NAME'") {
            define("DB_NAME", &settings.credentials.database)
        } else if line.contains("define('DB_USER'") {
            define("DB_USER", &settings.credentials.username)
        } else if line.contains("define('DB_HOST'") {
            define("DB_HOST", &settings.credentials.hostname)
        } else if line.contains("define('DB_PASSWORD'") {
            define("DB_PASSWORD", &settings.credentials.password)
        } else if line.trim_start().starts_with("$table_prefix") && line.contains('=') {
            format!("$table_prefix  = '{}';", settings.table_prefix)
        } else if line.contains("define('WP_DEBUG'") {
            debug_line = Some(lines.len() + 1);
            format!("define('WP_DEBUG', {});", settings.debug)
        } else if line.contains("define('WP_HOME'") {
            home_found = true;
            define("WP_HOME", settings.url)
        } else if line.contains("define('WP_SITEURL'") {
            siteurl_found = true;
            define("WP_SITEURL", &site_url)
        } else {
            line.to_string()
        };
        lines.push(rewritten);
    }

    if !home_found || !siteurl_found {
        let block = [
            String::new(),
            "/**".to_string(),
            " * WordPress Site URL.".to_string(),
            " *".to_string(),
            " * This is automatically configured by dirt depending on the environment.".to_string(),
            " * Note that this overrides the URL configured in the database.".to_string(),
            " */".to_string(),
            define("WP_HOME", settings.url),
            define("WP_SITEURL", &site_url),
            String::new(),
            "/**".to_string(),
            " * Enable/disable caching".to_string(),
            " */".to_string(),
            format!("define('WP_CACHE', {});", !settings.debug),
        ];
        let at = debug_line.unwrap_or(lines.len());
        lines.splice(at..at, block);
    }

    let at = lines.len().min(1);
    lines.splice(at..at, HEADER.iter().map(|line| line.to_string()));

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}
