use tracing::info;

use super::{Phase, ScratchFile, Synchronizer};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::migrate::migrate_file;
use crate::mysql::{Database, MySql};
use crate::output::step;
use crate::project::Project;
use crate::remote;

/// Flags of `transfer:db`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferOptions {
    /// Import the dump as is, without rewriting the source site's host name.
    pub skip_migration: bool,
}

impl Synchronizer<'_> {
    /// Copies the project database from `source` to `destination`,
    /// replacing whatever the destination had.
    pub fn transfer_database(
        &mut self,
        project: &mut Project,
        source: &Environment,
        destination: &Environment,
        options: &TransferOptions,
    ) -> Result<()> {
        self.begin()?;
        check_endpoints(source, destination)?;
        let source_credentials = project.database_credentials(source)?;
        let destination_credentials = project.database_credentials(destination)?;
        let from_url = project.url(source)?.to_string();
        let to_url = project.url(destination)?.to_string();
        project.save()?;

        eprintln!("Transfer database dump {source} -> {destination}");
        if !self.confirm(&format!(
            "This will overwrite any changes in the {destination} database, are you sure that you want to proceed?"
        ))? {
            return Ok(());
        }

        let token = remote::unique_token(&project.name);
        let remote_dump = format!("/tmp/{token}.sql");
        let local_dump = ScratchFile::new(&format!("{token}.sql"));

        self.advance(Phase::ConnectingSource)?;
        let from = self.connect(source, project)?;

        self.advance(Phase::SynchronizingDatabase)?;
        step("Creating database dump", || {
            Database::new(&from, MySql::for_credentials(&source_credentials))
                .dump(&source_credentials.database, &remote_dump)
        })?;
        step("Downloading database dump", || {
            from.file_transfer()?.download(&remote_dump, local_dump.path())
        })?;
        step("Cleaning up", || from.run(&remote::remove_file(&remote_dump)))?;

        if options.skip_migration {
            info!("skipping migration of {from_url}");
        } else {
            let replaced = step(&format!("Migrating {from_url} to {to_url}"), || {
                migrate_file(local_dump.path(), &from_url, &to_url)
            })?;
            info!("rewrote {replaced} occurrence(s) of {from_url}");
        }

        let to = self.connect(destination, project)?;
        step("Uploading database dump", || {
            to.file_transfer()?.upload(&remote_dump, local_dump.path())
        })?;
        step("Importing database", || {
            Database::new(&to, MySql::for_credentials(&destination_credentials))
                .import(&remote_dump, &destination_credentials.database)
        })?;
        step("Cleaning up", || to.run(&remote::remove_file(&remote_dump)))?;

        self.advance(Phase::Done)?;
        eprintln!("Database transferred from {source} to {destination}");
        Ok(())
    }

    /// Copies the framework's uploads folder from `source` to
    /// `destination`. Files only present at the destination are kept.
    pub fn transfer_uploads(
        &mut self,
        project: &mut Project,
        source: &Environment,
        destination: &Environment,
    ) -> Result<()> {
        self.begin()?;
        check_endpoints(source, destination)?;
        let uploads = project.uploads_folder()?.ok_or_else(|| {
            Error::Validation(format!(
                "{} has no uploads folder to transfer",
                project.name
            ))
        })?;
        let source_uploads = format!("{}/{uploads}", project.site_directory(source, self.config)?);
        let destination_uploads = format!(
            "{}/{uploads}",
            project.site_directory(destination, self.config)?
        );

        eprintln!("Transfer uploads {source} -> {destination}");
        if !self.confirm(&format!(
            "This will overwrite uploaded files in {destination}, are you sure that you want to proceed?"
        ))? {
            return Ok(());
        }

        let token = remote::unique_token(&project.name);
        let remote_archive = format!("/tmp/{token}.tar.gz");
        let local_archive = ScratchFile::new(&format!("{token}.tar.gz"));

        self.advance(Phase::ConnectingSource)?;
        let from = self.connect(source, project)?;

        self.advance(Phase::SynchronizingFiles)?;
        step("Creating uploads archive", || {
            from.run(&remote::archive_contents(&source_uploads, &remote_archive))
        })?;
        step("Downloading uploads archive", || {
            from.file_transfer()?
                .download(&remote_archive, local_archive.path())
        })?;
        step("Cleaning up", || from.run(&remote::remove_file(&remote_archive)))?;

        let to = self.connect(destination, project)?;
        step("Uploading uploads archive", || {
            to.file_transfer()?.upload(&remote_archive, local_archive.path())
        })?;
        step("Extracting uploads", || {
            let mut session = to
                .start_session()
                .add(remote::extract_archive(&remote_archive, &destination_uploads));
            // The dev web server runs as a different user than ssh
            if *destination == Environment::Dev {
                session = session.add(remote::make_world_writable(&destination_uploads));
            }
            session.add(remote::remove_file(&remote_archive)).execute()
        })?;

        self.advance(Phase::Done)?;
        eprintln!("Uploads transferred from {source} to {destination}");
        Ok(())
    }
}

/// Transfers need two distinct hosts.
fn check_endpoints(source: &Environment, destination: &Environment) -> Result<()> {
    let movable = |environment: &Environment| {
        !matches!(environment, Environment::WpEngine | Environment::Branch(_))
    };
    if !movable(source) || !movable(destination) {
        return Err(Error::Validation(
            "transfers run between dev, staging and production".to_string(),
        ));
    }
    if source == destination {
        return Err(Error::Validation(format!(
            "source and destination are both {source}"
        )));
    }
    Ok(())
}
