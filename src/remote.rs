//! Helper functions that construct server-side shell command strings.
//!
//! These are pure string-building functions; they don't execute anything.
//! Orchestration code passes the returned strings to a
//! [`Terminal`](crate::terminal::Terminal).

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::config::WebServer;

/// Heredoc delimiter used when writing files through the shell.
const EOF_MARKER: &str = "DIRT_EOF";

/// Directories never shipped to production.
const ARCHIVE_EXCLUDES: [&str; 2] = [".git", "mixture"];

/// Full path of a vhost file.
pub fn vhost_path(webserver: &WebServer, vhost_name: &str) -> String {
    format!("{}/{vhost_name}", webserver.vhost_dir.trim_end_matches('/'))
}

/// Command to check whether a regular file exists (exit 0 = exists).
pub fn file_exists(path: &str) -> String {
    format!("test -f {path}")
}

/// Writes `content` to `path` via a quoted heredoc, so nothing in the content
/// is expanded by the shell.
pub fn write_file(path: &str, content: &str) -> String {
    format!(
        "cat > {path} << '{EOF_MARKER}'\n{}\n{EOF_MARKER}",
        content.trim_end_matches('\n')
    )
}

/// Like [`write_file`] but for paths owned by root.
pub fn sudo_write_file(path: &str, content: &str) -> String {
    format!(
        "sudo tee {path} > /dev/null << '{EOF_MARKER}'\n{}\n{EOF_MARKER}",
        content.trim_end_matches('\n')
    )
}

/// Creates the site directory with its public document root.
pub fn mkdir_site(site_directory: &str) -> String {
    format!("sudo mkdir -p {site_directory}/public")
}

/// Hands the site directory to the deploy user.
pub fn chown_site(username: &str, site_directory: &str) -> String {
    format!("sudo chown -R {username}:{username} {site_directory}")
}

/// Gives the web server's group write access to everything in `directory`.
pub fn group_write(group: &str, directory: &str, privileged: bool) -> String {
    let sudo = if privileged { "sudo -n " } else { "" };
    format!("{sudo}chgrp -R {group} {directory} && {sudo}chmod -R g+w {directory}")
}

pub fn remove_vhost(path: &str) -> String {
    format!("sudo rm {path}")
}

/// Removes a site directory. Callers must have validated the path.
pub fn remove_site(site_directory: &str) -> String {
    format!("sudo rm -rf {site_directory}/")
}

/// Packs the contents of `directory` into a gzipped tarball.
pub fn archive_directory(directory: &str, archive: &str) -> String {
    let excludes: Vec<String> = ARCHIVE_EXCLUDES
        .iter()
        .map(|pattern| format!("--exclude={pattern}"))
        .collect();
    format!(
        "cd {directory} && tar -zcf {archive} {} .",
        excludes.join(" ")
    )
}

/// Packs the contents of `directory`, with paths relative to it.
pub fn archive_contents(directory: &str, archive: &str) -> String {
    format!("tar -zcf {archive} -C {directory} .")
}

/// Unpacks an archive into `directory`, creating it if needed.
pub fn extract_archive(archive: &str, directory: &str) -> String {
    format!("mkdir -p {directory} && tar -zxf {archive} -C {directory}")
}

pub fn remove_file(path: &str) -> String {
    format!("rm -f {path}")
}

pub fn make_world_writable(directory: &str) -> String {
    format!("chmod -R 777 {directory}")
}

static TOKEN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A token unique to this project and moment, for temporary file names.
pub fn unique_token(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let digest = hasher.finalize();
    digest.iter().take(20).map(|b| format!("{b:02x}")).collect()
}
