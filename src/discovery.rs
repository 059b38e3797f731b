//! Locating the project a command acts on.
//!
//! Only the working directory itself counts as a project root: a deploy from
//! `public/` must not silently pick up the manifest one level up. When a parent
//! does hold a manifest, the error names it.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// The per-project manifest file name.
pub const MANIFEST_FILE: &str = "Dirtfile.json";

/// Returns `start` if it holds a `Dirtfile.json`.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    if start.join(MANIFEST_FILE).is_file() {
        return Ok(start.to_path_buf());
    }
    match enclosing_project(start) {
        Some(root) => {
            debug!("manifest found above {} in {}", start.display(), root.display());
            Err(Error::Validation(format!(
                "{} is inside the project at {}, run dirt from there",
                start.display(),
                root.display()
            )))
        }
        None => Err(Error::ManifestNotFound {
            start_dir: start.to_path_buf(),
        }),
    }
}

/// The nearest strict ancestor of `start` that holds a manifest.
fn enclosing_project(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .skip(1)
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}
