use std::path::Path;

use tracing::{info, warn};

use super::{configure_framework, grant_group_write, DeployOptions, Phase, Synchronizer};
use crate::environment::Environment;
use crate::error::Result;
use crate::framework::Site;
use crate::output::step;
use crate::project::Project;
use crate::remote;
use crate::terminal::Terminal;

impl Synchronizer<'_> {
    /// Ships a snapshot of the staging site to production.
    ///
    /// Production never talks to git: the staging directory is archived,
    /// copied through this machine and unpacked in place.
    pub(super) fn deploy_production(
        &mut self,
        project: &mut Project,
        options: &DeployOptions,
    ) -> Result<()> {
        self.begin()?;
        let config = self.config;
        let staging_directory = project.site_directory(&Environment::Staging, config)?;
        let production_directory = project.site_directory(&Environment::Production, config)?;
        let production_server = config.server(&Environment::Production)?;

        if !self.confirm(&format!(
            "Deploy the current staging site to production ({})?",
            project.urls.production
        ))? {
            return Ok(());
        }

        self.advance(Phase::ConnectingSource)?;
        let staging = self.connect(&Environment::Staging, project)?;

        self.advance(Phase::SynchronizingFiles)?;
        let archive_name = format!("deploy_{}.tar.gz", remote::unique_token(&project.name));
        let staging_archive = format!("/tmp/{archive_name}");
        let local_archive = project.directory().join(&archive_name);

        step("Packing code for deployment", || {
            staging.run(&remote::archive_directory(&staging_directory, &staging_archive))
        })?;
        let downloaded = step("Downloading source code from staging", || {
            staging
                .file_transfer()?
                .download(&staging_archive, &local_archive)
        });
        let shipped = downloaded.and_then(|()| {
            step("Removing tmp archive from staging", || {
                staging.run(&remote::remove_file(&staging_archive))
            })?;
            let production = self.connect(&Environment::Production, project)?;
            ship(&production, &local_archive, &archive_name, &production_directory)?;
            Ok(production)
        });
        remove_local_archive(&local_archive);
        let production = shipped?;

        if let Some(framework) = project.framework()? {
            let site = Site {
                terminal: &production,
                directory: production_directory.clone(),
            };
            configure_framework(framework, &Environment::Production, project, &site)?;
        }
        step("Applying group write permissions", || {
            grant_group_write(
                &production,
                &production_server.webserver.group,
                &production_directory,
            )
        })?;

        self.advance(Phase::Done)?;
        info!("deployed {} to production", project.name);
        self.finish(project, &project.http_url(&Environment::Production)?, options)
    }
}

/// Uploads the local archive next to the production site, unpacks it and
/// removes the uploaded copy.
fn ship(
    production: &Terminal<'_>,
    local_archive: &Path,
    archive_name: &str,
    production_directory: &str,
) -> Result<()> {
    let remote_archive = format!("{production_directory}/{archive_name}");
    step("Uploading source code to production", || {
        production
            .file_transfer()?
            .upload(&remote_archive, local_archive)
    })?;
    step("Extracting archive", || {
        production.run(&remote::extract_archive(&remote_archive, production_directory))
    })?;
    step("Removing deploy archive from production", || {
        production.run(&remote::remove_file(&remote_archive))
    })?;
    Ok(())
}

fn remove_local_archive(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::project::test_project;
    use crate::test_support::{Invocation, MockResponse, MockRunner, ScriptedPrompt};

    #[test]
    fn ships_staging_snapshot_to_production() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = test_project(dir.path());
        project.production_directory = Some("/home/shop/public_html/".into());
        let config = test_config();
        let mock = MockRunner::new();
        // staging probe, tar
        mock.add_ok(2);
        // download
        mock.add_response(MockResponse::Ok("archive bytes".into()));
        // rm on staging, production probe
        mock.add_ok(2);
        // upload, extract, rm on production
        mock.add_ok(3);
        // group write
        mock.add_ok(1);
        let prompt = ScriptedPrompt::confirming(&[true]);

        let mut sync = Synchronizer::new(&mock, &config, &prompt);
        sync.deploy(
            &mut project,
            &Environment::Production,
            &DeployOptions { no_prompt: true },
        )
        .unwrap();

        let inv = mock.invocations();
        assert_eq!(inv.len(), 9);
        match &inv[1] {
            Invocation::Ssh { host, command } => {
                assert_eq!(host, "staging.example.com");
                assert!(command.starts_with(
                    "cd /var/www/sites/new-test-project.staging.example.com && tar -zcf /tmp/deploy_"
                ));
                assert!(command.contains("--exclude=.git"));
            }
            other => panic!("expected Ssh tar, got {other:?}"),
        }
        let local_archive = match &inv[2] {
            Invocation::Download { host, remote, local } => {
                assert_eq!(host, "staging.example.com");
                assert!(remote.starts_with("/tmp/deploy_"));
                assert_eq!(local.parent(), Some(dir.path()));
                local.clone()
            }
            other => panic!("expected Download, got {other:?}"),
        };
        match &inv[5] {
            Invocation::Upload { host, remote, local } => {
                assert_eq!(host, "prod.example.com");
                assert!(remote.starts_with("/home/shop/public_html/deploy_"));
                assert_eq!(local, &local_archive);
            }
            other => panic!("expected Upload, got {other:?}"),
        }
        match &inv[6] {
            Invocation::Ssh { command, .. } => {
                assert!(command.starts_with("mkdir -p /home/shop/public_html && tar -zxf"));
            }
            other => panic!("expected Ssh extract, got {other:?}"),
        }
        assert_eq!(mock.uploaded(), vec!["archive bytes"]);
        // local copy cleaned up
        assert!(!local_archive.exists());
        assert_eq!(sync.phase(), Phase::Done);
    }

    #[test]
    fn requires_production_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = test_project(dir.path());
        let config = test_config();
        let mock = MockRunner::new();
        let prompt = ScriptedPrompt::new();

        let mut sync = Synchronizer::new(&mock, &config, &prompt);
        let err = sync
            .deploy(&mut project, &Environment::Production, &DeployOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("production_directory"));
        assert!(mock.invocations().is_empty());
    }

    #[test]
    fn failed_upload_still_removes_local_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = test_project(dir.path());
        project.production_directory = Some("/srv/shop".into());
        let config = test_config();
        let mock = MockRunner::new();
        mock.add_ok(2);
        mock.add_response(MockResponse::Ok("archive".into()));
        mock.add_ok(2);
        mock.add_response(MockResponse::Fail("scp: Permission denied".into()));
        let prompt = ScriptedPrompt::confirming(&[true]);

        let mut sync = Synchronizer::new(&mock, &config, &prompt);
        assert!(sync
            .deploy(&mut project, &Environment::Production, &DeployOptions::default())
            .is_err());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("deploy_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn undeploy_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = test_project(dir.path());
        let config = test_config();
        let mock = MockRunner::new();
        let prompt = ScriptedPrompt::new();
        let mut sync = Synchronizer::new(&mock, &config, &prompt);
        sync.undeploy(&mut project, &Environment::Production).unwrap();
        assert!(mock.invocations().is_empty());
    }
}
