//! `dirt seed`: fills a project with starter code.
//!
//! Starter repositories come from the `seed` section of `Dirtfile.json`,
//! falling back field by field to the team's `[seed.<framework>]` table.
//! Only WordPress has anything to seed: a theme and a plugins directory.

use std::path::Path;

use tracing::info;

use crate::config::Configuration;
use crate::error::Result;
use crate::git::Git;
use crate::output::step;
use crate::project::{Project, SeedSources};
use crate::prompt::Prompt;
use crate::runner::CommandRunner;
use crate::terminal::Terminal;

const WP_CONTENT: &str = "public/wp-content";

/// The framework the project's files belong to: the manifest's, or the one
/// recognised from marker files.
pub fn detect_framework(project: &Project) -> Result<Option<&'static str>> {
    if let Some(framework) = project.framework()? {
        return Ok(Some(framework.name()));
    }
    Ok(detect_from_files(project.directory()))
}

fn detect_from_files(directory: &Path) -> Option<&'static str> {
    if directory.join("public/wp-config.php").is_file() {
        Some("wordpress")
    } else if directory.join("artisan").is_file() {
        Some("laravel")
    } else {
        None
    }
}

/// The project's sources, with blanks filled from the team's.
pub fn resolve_sources(project: Option<&SeedSources>, team: Option<&SeedSources>) -> SeedSources {
    let pick = |own: Option<&Option<String>>, shared: Option<&Option<String>>| {
        own.and_then(non_empty).or_else(|| shared.and_then(non_empty))
    };
    SeedSources {
        build: pick(project.map(|s| &s.build), team.map(|s| &s.build)),
        theme: pick(project.map(|s| &s.theme), team.map(|s| &s.theme)),
        plugins: pick(project.map(|s| &s.plugins), team.map(|s| &s.plugins)),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn run(
    runner: &dyn CommandRunner,
    config: &Configuration,
    prompt: &dyn Prompt,
    project: &Project,
) -> Result<()> {
    let framework = step("Detecting environment", || detect_framework(project))?;
    let Some(framework) = framework else {
        eprintln!("No framework found in {}, nothing to seed.", project.directory().display());
        return Ok(());
    };
    eprintln!("Found {framework}");

    let sources = resolve_sources(project.seed.as_ref(), config.team_seed(framework));
    if sources == SeedSources::default() {
        eprintln!(
            "No seed repositories found. Add a \"seed\" section to Dirtfile.json or \
             [seed.{framework}] to the team configuration, then rerun \"dirt seed\"."
        );
        return Ok(());
    }
    if framework != "wordpress" {
        eprintln!("Nothing to seed for {framework} projects.");
        return Ok(());
    }

    if sources.theme.is_none() {
        eprintln!("No theme repository found, continuing.");
    }
    if sources.plugins.is_none() {
        eprintln!("No plugins repository found, continuing.");
    }
    if sources.theme.is_none() && sources.plugins.is_none() {
        return Ok(());
    }
    if !prompt.confirm(
        &format!("Seeding replaces the themes and plugins in {WP_CONTENT}. Continue?"),
        false,
    )? {
        eprintln!("Aborted.");
        return Ok(());
    }

    let local = Terminal::local(runner, project.directory());
    if let Some(theme) = &sources.theme {
        let destination = format!("{WP_CONTENT}/themes/{}", project.name.to_lowercase());
        step("Getting theme repository", || {
            local.run(&format!("rm -rf {WP_CONTENT}/themes/*"))?;
            Git::new(&local).clone(theme, Some(destination.as_str()))
        })?;
    }
    if let Some(plugins) = &sources.plugins {
        let destination = format!("{WP_CONTENT}/plugins");
        step("Getting plugins repository", || {
            local.run(&format!("rm -rf {destination}"))?;
            Git::new(&local).clone(plugins, Some(destination.as_str()))
        })?;
    }
    info!("seeded {}", project.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::project::test_project;
    use crate::test_support::{MockRunner, ScriptedPrompt};

    fn sources(theme: Option<&str>, plugins: Option<&str>) -> SeedSources {
        SeedSources {
            build: None,
            theme: theme.map(str::to_string),
            plugins: plugins.map(str::to_string),
        }
    }

    fn wordpress_project(dir: &Path) -> Project {
        let mut project = test_project(dir);
        project.framework = Some("wordpress".into());
        project
    }

    #[test]
    fn project_sources_win_field_by_field() {
        let own = sources(Some("git@github.com:me/theme.git"), Some("  "));
        let team = sources(Some("git@github.com:team/theme.git"), Some("git@github.com:team/plugins.git"));

        let resolved = resolve_sources(Some(&own), Some(&team));
        assert_eq!(resolved.theme.as_deref(), Some("git@github.com:me/theme.git"));
        assert_eq!(resolved.plugins.as_deref(), Some("git@github.com:team/plugins.git"));
        assert_eq!(resolve_sources(None, None), SeedSources::default());
    }

    #[test]
    fn framework_from_marker_files() {
        let dir = tempfile::tempdir().unwrap();
        let project = test_project(dir.path());
        assert_eq!(detect_framework(&project).unwrap(), None);

        std::fs::write(dir.path().join("artisan"), "").unwrap();
        assert_eq!(detect_framework(&project).unwrap(), Some("laravel"));

        std::fs::create_dir(dir.path().join("public")).unwrap();
        std::fs::write(dir.path().join("public/wp-config.php"), "").unwrap();
        assert_eq!(detect_framework(&project).unwrap(), Some("wordpress"));
    }

    #[test]
    fn clones_theme_and_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = wordpress_project(dir.path());
        project.seed = Some(sources(
            Some("git@github.com:acme/theme.git"),
            Some("git@github.com:acme/plugins.git"),
        ));
        let mock = MockRunner::new();
        mock.add_ok(4);
        let prompt = ScriptedPrompt::confirming(&[true]);

        run(&mock, &test_config(), &prompt, &project).unwrap();

        assert_eq!(
            mock.commands(),
            vec![
                "rm -rf public/wp-content/themes/*",
                "git clone git@github.com:acme/theme.git public/wp-content/themes/new-test-project",
                "rm -rf public/wp-content/plugins",
                "git clone git@github.com:acme/plugins.git public/wp-content/plugins",
            ]
        );
    }

    #[test]
    fn team_theme_is_used_without_project_seed() {
        let dir = tempfile::tempdir().unwrap();
        let project = wordpress_project(dir.path());
        let mut config = test_config();
        config.seed.wordpress = sources(Some("git@github.com:team/theme.git"), None);
        let mock = MockRunner::new();
        mock.add_ok(2);
        let prompt = ScriptedPrompt::confirming(&[true]);

        run(&mock, &config, &prompt, &project).unwrap();

        let commands = mock.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[1].starts_with("git clone git@github.com:team/theme.git "));
    }

    #[test]
    fn nothing_configured_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let project = wordpress_project(dir.path());
        let mock = MockRunner::new();
        let prompt = ScriptedPrompt::new();

        run(&mock, &test_config(), &prompt, &project).unwrap();
        assert!(mock.invocations().is_empty());
        assert!(prompt.asked().is_empty());
    }

    #[test]
    fn declining_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = wordpress_project(dir.path());
        project.seed = Some(sources(Some("git@github.com:acme/theme.git"), None));
        let mock = MockRunner::new();
        let prompt = ScriptedPrompt::confirming(&[false]);

        run(&mock, &test_config(), &prompt, &project).unwrap();
        assert!(mock.invocations().is_empty());
    }

    #[test]
    fn laravel_has_nothing_to_seed() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = test_project(dir.path());
        project.framework = Some("laravel".into());
        project.seed = Some(sources(Some("git@github.com:acme/theme.git"), None));
        let mock = MockRunner::new();

        run(&mock, &test_config(), &ScriptedPrompt::new(), &project).unwrap();
        assert!(mock.invocations().is_empty());
    }
}
