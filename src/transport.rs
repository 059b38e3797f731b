//! ssh and scp argument construction.
//!
//! These functions are pure (no I/O) so they can be unit-tested. Every
//! invocation for a host shares one OpenSSH control socket, so the first
//! authenticated connection is reused by later commands and file transfers
//! instead of renegotiating each time.

use std::path::Path;

use crate::profile::ConnectionProfile;

/// Control socket template. `%C` is a hash of local host, remote host, port
/// and user, keeping the path short and unique per profile.
const CONTROL_PATH: &str = "/tmp/dirt-ssh-%C";

/// File transfer direction, relative to the local machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

/// Options shared by ssh and scp.
fn common_options(profile: &ConnectionProfile) -> Vec<String> {
    vec![
        "-i".to_string(),
        profile.keyfile.clone(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "-o".to_string(),
        "ControlMaster=auto".to_string(),
        "-o".to_string(),
        format!("ControlPath={CONTROL_PATH}"),
        "-o".to_string(),
        "ControlPersist=60".to_string(),
    ]
}

/// Builds the ssh argument list up to (not including) the remote command.
pub fn ssh_args(profile: &ConnectionProfile) -> Vec<String> {
    let mut args = vec!["-p".to_string(), profile.port.to_string()];
    args.extend(common_options(profile));
    args.push(profile.destination());
    args
}

/// Builds the full scp argument list for one file.
pub fn scp_args(
    profile: &ConnectionProfile,
    direction: Direction,
    local_path: &Path,
    remote_path: &str,
) -> Vec<String> {
    // scp spells the port flag in upper case
    let mut args = vec!["-P".to_string(), profile.port.to_string()];
    args.extend(common_options(profile));
    args.push("-q".to_string());

    let local = local_path.display().to_string();
    let remote = format!("{}:{}", profile.destination(), remote_path);
    match direction {
        Direction::Upload => {
            args.push(local);
            args.push(remote);
        }
        Direction::Download => {
            args.push(remote);
            args.push(local);
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::test_profile;
    use std::path::PathBuf;

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn ssh_args_port_key_and_destination() {
        let mut profile = test_profile();
        profile.port = 2200;
        let args = ssh_args(&profile);
        assert_eq!(args[0], "-p");
        assert_eq!(args[1], "2200");
        assert!(has_pair(&args, "-i", "/home/me/.ssh/id_rsa"));
        assert_eq!(args.last().unwrap(), "deploy@staging.example.com");
    }

    #[test]
    fn ssh_args_are_non_interactive() {
        let args = ssh_args(&test_profile());
        assert!(has_pair(&args, "-o", "BatchMode=yes"));
    }

    #[test]
    fn ssh_and_scp_share_control_socket() {
        let profile = test_profile();
        let control = format!("ControlPath={CONTROL_PATH}");
        assert!(has_pair(&ssh_args(&profile), "-o", &control));
        let scp = scp_args(&profile, Direction::Upload, Path::new("/tmp/a"), "/tmp/b");
        assert!(has_pair(&scp, "-o", &control));
        assert!(has_pair(&scp, "-o", "ControlMaster=auto"));
    }

    #[test]
    fn scp_upload_order() {
        let args = scp_args(
            &test_profile(),
            Direction::Upload,
            &PathBuf::from("/tmp/local.sql"),
            "/tmp/remote.sql",
        );
        assert_eq!(args[0], "-P");
        assert_eq!(args[1], "22");
        let n = args.len();
        assert_eq!(args[n - 2], "/tmp/local.sql");
        assert_eq!(args[n - 1], "deploy@staging.example.com:/tmp/remote.sql");
    }

    #[test]
    fn scp_download_order() {
        let args = scp_args(
            &test_profile(),
            Direction::Download,
            &PathBuf::from("/tmp/local.sql"),
            "/tmp/remote.sql",
        );
        let n = args.len();
        assert_eq!(args[n - 2], "deploy@staging.example.com:/tmp/remote.sql");
        assert_eq!(args[n - 1], "/tmp/local.sql");
    }
}
