use shell_quote::{Bash, QuoteRefExt};
use tracing::info;

use super::{commit_pending, Phase, Synchronizer};
use crate::error::{Error, Result};
use crate::git::Git;
use crate::output::step;
use crate::project::{Project, WpEngineSettings};
use crate::terminal::Terminal;

/// git-ftp exits with this code when the remote already holds a deployment.
const ALREADY_INITIALIZED: i32 = 2;

const INSTALL_HINT: &str = "https://github.com/git-ftp/git-ftp/blob/develop/INSTALL.md";

impl Synchronizer<'_> {
    /// Uploads the committed tree to WP Engine with git-ftp.
    ///
    /// The first deploy initializes the remote. Later deploys find it
    /// initialized and push only what changed since the last upload.
    pub(super) fn deploy_wpengine(&mut self, project: &mut Project) -> Result<()> {
        self.begin()?;
        let settings = project.wpengine.clone().ok_or_else(|| {
            Error::Validation(
                "wpengine is not configured, add a \"wpengine\" section with FTP_USER, \
                 FTP_PASSWORD and FTP_URL to Dirtfile.json"
                    .to_string(),
            )
        })?;
        check_settings(&settings)?;

        self.advance(Phase::ConnectingSource)?;
        let local = Terminal::local(self.runner, project.directory());
        step("Checking for git-ftp", || {
            if local.try_run("command -v git-ftp")?.success {
                Ok(())
            } else {
                Err(Error::Validation(format!(
                    "git-ftp is required to deploy to wpengine, see {INSTALL_HINT}"
                )))
            }
        })?;

        // git-ftp uploads commits, not the working tree
        self.advance(Phase::SynchronizingVcs)?;
        commit_pending(Git::new(&local), self.prompt)?;

        self.advance(Phase::SynchronizingFiles)?;
        let initialized = step("Initializing git-ftp and deploying", || {
            let attempt = local.try_run(&git_ftp("init", &settings))?;
            match attempt.code {
                Some(0) => Ok(true),
                Some(ALREADY_INITIALIZED) => Ok(false),
                code => Err(git_ftp_failure("init", code)),
            }
        })?;
        if !initialized {
            step("Already initialized, pushing changes", || {
                let attempt = local.try_run(&git_ftp("push", &settings))?;
                match attempt.code {
                    Some(0) => Ok(()),
                    code => Err(git_ftp_failure("push", code)),
                }
            })?;
        }

        self.advance(Phase::Done)?;
        info!("deployed {} to wpengine at {}", project.name, settings.host);
        eprintln!();
        eprintln!("Deployment finished to {}", settings.host);
        Ok(())
    }
}

fn check_settings(settings: &WpEngineSettings) -> Result<()> {
    let missing: Vec<&str> = [
        ("FTP_USER", &settings.user),
        ("FTP_PASSWORD", &settings.password),
        ("FTP_URL", &settings.host),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(key, _)| key)
    .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "wpengine settings in Dirtfile.json are missing {}",
            missing.join(", ")
        )))
    }
}

/// `git ftp <action>` against the install described by `settings`.
fn git_ftp(action: &str, settings: &WpEngineSettings) -> String {
    let quote = |value: &str| -> String { value.quoted(Bash) };
    let url = format!(
        "{}://{}:{}/{}",
        settings.protocol, settings.host, settings.port, settings.remote_folder
    );
    format!(
        "git ftp {action} --user {} --passwd {} {} --syncroot {}",
        quote(&settings.user),
        quote(&settings.password),
        quote(&url),
        quote(&settings.sync_root)
    )
}

/// Explains a git-ftp exit code. The command line is left out because it
/// carries the password.
fn git_ftp_failure(action: &str, code: Option<i32>) -> Error {
    let reason = match code {
        Some(2) => "wrong usage",
        Some(3) => "missing arguments",
        Some(4) => "error while uploading",
        Some(5) => "error while downloading",
        Some(6) => "unknown protocol",
        Some(7) => "remote locked",
        Some(8) => "not a git project",
        _ => "unknown error",
    };
    Error::CommandFailed {
        command: format!("git ftp {action}"),
        message: format!("deployment to wpengine failed: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::environment::Environment;
    use crate::project::test_project;
    use crate::sync::DeployOptions;
    use crate::test_support::{MockResponse, MockRunner, ScriptedPrompt};

    const CLEAN: &str = "On branch master\nnothing to commit, working tree clean\n";

    fn settings() -> WpEngineSettings {
        WpEngineSettings {
            user: "shop-ftp".into(),
            password: "s3cret".into(),
            host: "shop.sftp.wpengine.com".into(),
            protocol: "sftp".into(),
            port: "2222".into(),
            remote_folder: "wp-content".into(),
            sync_root: "public/wp-content".into(),
        }
    }

    fn configured_project(dir: &std::path::Path) -> Project {
        let mut project = test_project(dir);
        project.wpengine = Some(settings());
        project
    }

    fn deploy(mock: &MockRunner, project: &mut Project) -> Result<()> {
        let config = test_config();
        let prompt = ScriptedPrompt::new();
        let mut sync = Synchronizer::new(mock, &config, &prompt);
        let result = sync.deploy(project, &Environment::WpEngine, &DeployOptions::default());
        if result.is_ok() {
            assert_eq!(sync.phase(), Phase::Done);
        }
        result
    }

    #[test]
    fn git_ftp_command_line() {
        let command = git_ftp("init", &settings());
        assert!(command.starts_with("git ftp init --user "));
        assert!(command.contains("shop-ftp"));
        assert!(command.contains("--passwd "));
        assert!(command.contains("sftp://shop.sftp.wpengine.com:2222/wp-content"));
        assert!(command.contains("--syncroot "));
        assert!(command.contains("public/wp-content"));
    }

    #[test]
    fn first_deploy_initializes() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = configured_project(dir.path());
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok("/usr/local/bin/git-ftp\n".into()));
        mock.add_response(MockResponse::Ok(CLEAN.into()));
        mock.add_ok(1);

        deploy(&mock, &mut project).unwrap();

        let commands = mock.commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], "command -v git-ftp");
        assert_eq!(commands[1], "git status");
        assert!(commands[2].starts_with("git ftp init "));
    }

    #[test]
    fn initialized_remote_is_pushed() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = configured_project(dir.path());
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok("/usr/local/bin/git-ftp\n".into()));
        mock.add_response(MockResponse::Ok(CLEAN.into()));
        mock.add_response(MockResponse::Exit(2, "Commit found, use 'git ftp push'".into()));
        mock.add_ok(1);

        deploy(&mock, &mut project).unwrap();

        let commands = mock.commands();
        assert!(commands[2].starts_with("git ftp init "));
        assert!(commands[3].starts_with("git ftp push "));
        assert_eq!(commands[3].replacen("push", "init", 1), commands[2]);
    }

    #[test]
    fn failed_push_reports_reason_without_password() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = configured_project(dir.path());
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok("/usr/local/bin/git-ftp\n".into()));
        mock.add_response(MockResponse::Ok(CLEAN.into()));
        mock.add_response(MockResponse::Exit(2, String::new()));
        mock.add_response(MockResponse::Exit(7, String::new()));

        let err = deploy(&mock, &mut project).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("remote locked"));
        assert!(!message.contains("s3cret"));
    }

    #[test]
    fn failed_init_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = configured_project(dir.path());
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok("/usr/local/bin/git-ftp\n".into()));
        mock.add_response(MockResponse::Ok(CLEAN.into()));
        mock.add_response(MockResponse::Exit(4, "curl: (67) Login denied".into()));

        let err = deploy(&mock, &mut project).unwrap_err();
        assert!(err.to_string().contains("error while uploading"));
        assert_eq!(mock.commands().len(), 3);
    }

    #[test]
    fn missing_git_ftp_stops_before_anything_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = configured_project(dir.path());
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Fail(String::new()));

        let err = deploy(&mock, &mut project).unwrap_err();
        assert!(err.to_string().contains("git-ftp is required"));
        assert_eq!(mock.commands(), vec!["command -v git-ftp"]);
    }

    #[test]
    fn unconfigured_project_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = test_project(dir.path());
        let mock = MockRunner::new();

        let err = deploy(&mock, &mut project).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("FTP_URL"));
        assert!(mock.invocations().is_empty());
    }

    #[test]
    fn undeploy_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = configured_project(dir.path());
        let mock = MockRunner::new();
        let config = test_config();
        let prompt = ScriptedPrompt::new();
        let mut sync = Synchronizer::new(&mock, &config, &prompt);

        sync.undeploy(&mut project, &Environment::WpEngine).unwrap();
        assert!(mock.invocations().is_empty());
    }

    #[test]
    fn blank_credentials_are_named() {
        let mut incomplete = settings();
        incomplete.user = String::new();
        incomplete.password = " ".into();
        let err = check_settings(&incomplete).unwrap_err();
        assert!(err.to_string().contains("FTP_USER, FTP_PASSWORD"));
        assert!(check_settings(&settings()).is_ok());
    }
}
