use std::path::Path;

use tracing::info;

use super::{Framework, Site};
use crate::environment::Environment;
use crate::error::Result;
use crate::project::Project;

const UPLOADS_FOLDER: &str = "storage/uploads";

pub struct Laravel;

impl Framework for Laravel {
    fn name(&self) -> &'static str {
        "laravel"
    }

    fn shortcuts(&self) -> &'static [&'static str] {
        &["l5", "laravel5"]
    }

    /// Laravel projects only have uploads when they opted into
    /// `storage/uploads`.
    fn uploads_folder(&self, project_dir: &Path) -> Option<String> {
        project_dir
            .join(UPLOADS_FOLDER)
            .is_dir()
            .then(|| UPLOADS_FOLDER.to_string())
    }

    fn configure_environment(
        &self,
        environment: &Environment,
        _project: &mut Project,
        site: &Site<'_, '_>,
    ) -> Result<()> {
        info!("configuring laravel for {environment} in {}", site.directory);
        let session = site
            .terminal
            .start_session()
            .add(format!("cd {}", site.directory));

        let session = match environment {
            Environment::Dev => session.add("chmod -R 777 storage"),
            Environment::Staging => session
                .add("chmod -R 777 storage")
                .add("composer install --no-interaction")
                .add("php artisan migrate --env=staging --force")
                .add("php artisan optimize"),
            Environment::Production => session
                .add("ln -sf public html")
                .add("chmod -R 777 storage"),
            Environment::WpEngine | Environment::Branch(_) => return Ok(()),
        };
        session.execute()?;
        Ok(())
    }
}
