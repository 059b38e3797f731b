//! Shared error types used across all dirt modules.
//!
//! Every module returns [`Result<T>`] which uses [`Error`] as the error type.
//! Error messages are user-facing and include actionable recovery suggestions
//! (e.g., "run `vagrant up`").

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// All errors that dirt can produce.
///
/// A declined confirmation prompt is not represented here: operations return
/// `Ok(())` early instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration file {path} not found. Create it with your staging and production server details.")]
    ConfigNotFound { path: PathBuf },

    #[error("failed to parse configuration: {reason}")]
    ConfigParse { reason: String },

    #[error("Dirtfile.json not found in {start_dir}. Run dirt from the project root, or create a project with `dirt create`.")]
    ManifestNotFound { start_dir: PathBuf },

    #[error("failed to parse Dirtfile.json: {reason}")]
    ManifestParse { reason: String },

    #[error("could not connect to {host}: {message}")]
    Authentication { host: String, message: String },

    #[error("command failed: {command}: {message}")]
    CommandFailed { command: String, message: String },

    #[error("command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("{0}")]
    Validation(String),

    #[error("repository host error: {0}")]
    Repository(String),

    #[error("framework {framework} failed: {message}")]
    Framework { framework: String, message: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),
}
