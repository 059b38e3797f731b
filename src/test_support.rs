//! Fakes for unit tests: [`MockRunner`] stands in for ssh, scp and local
//! shells, [`ScriptedPrompt`] for the person at the keyboard.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::error::{Error, Result};
use crate::profile::ConnectionProfile;
use crate::prompt::Prompt;
use crate::runner::{CommandOutput, CommandRunner};
use crate::transport::Direction;

/// One call recorded by [`MockRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Local {
        dir: PathBuf,
        command: String,
    },
    Ssh {
        host: String,
        command: String,
    },
    Upload {
        host: String,
        local: PathBuf,
        remote: String,
    },
    Download {
        host: String,
        remote: String,
        local: PathBuf,
    },
}

/// What the next call to a [`MockRunner`] returns.
pub enum MockResponse {
    /// Exit 0 with this stdout.
    Ok(String),
    /// Exit 0 with this stdout and stderr.
    OkWithStderr(String, String),
    /// Non-zero exit with this stderr.
    Fail(String),
    /// Exit with this code and stderr.
    Exit(i32, String),
    /// The runner itself fails, as when ssh cannot be spawned.
    Err(String),
}

/// A real exit status, taken from a shell that exits with `code`.
fn exit_status(code: i32) -> ExitStatus {
    std::process::Command::new("sh")
        .args(["-c", &format!("exit {code}")])
        .status()
        .unwrap_or_else(|e| panic!("cannot run sh: {e}"))
}

/// Records every call and answers from a FIFO queue of [`MockResponse`]s.
///
/// Uploads capture the local file's contents at call time. A successful
/// download writes the queued stdout to the local path, so callers that
/// read the downloaded dump see the canned payload.
///
/// Running out of queued responses panics.
pub struct MockRunner {
    invocations: RefCell<Vec<Invocation>>,
    responses: RefCell<Vec<MockResponse>>,
    uploaded: RefCell<Vec<String>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            invocations: RefCell::new(Vec::new()),
            responses: RefCell::new(Vec::new()),
            uploaded: RefCell::new(Vec::new()),
        }
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses.borrow_mut().push(response);
    }

    /// Queues `count` empty successful responses.
    pub fn add_ok(&self, count: usize) {
        for _ in 0..count {
            self.add_response(MockResponse::Ok(String::new()));
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// The command strings of all local and ssh invocations, in order.
    pub fn commands(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .filter_map(|inv| match inv {
                Invocation::Local { command, .. } | Invocation::Ssh { command, .. } => {
                    Some(command.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Contents of every uploaded local file, read at upload time.
    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.borrow().clone()
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.borrow().len()
    }

    /// Logs `invocation` and pops the queued reply for it.
    fn reply(&self, invocation: Invocation) -> Result<CommandOutput> {
        self.invocations.borrow_mut().push(invocation.clone());
        let mut responses = self.responses.borrow_mut();
        if responses.is_empty() {
            panic!("MockRunner: no more responses queued for {invocation:?}");
        }
        let (stdout, stderr, code) = match responses.remove(0) {
            MockResponse::Ok(stdout) => (stdout, String::new(), 0),
            MockResponse::OkWithStderr(stdout, stderr) => (stdout, stderr, 0),
            MockResponse::Fail(stderr) => (String::new(), stderr, 1),
            MockResponse::Exit(code, stderr) => (String::new(), stderr, code),
            MockResponse::Err(message) => {
                return Err(Error::CommandFailed {
                    command: "mock".to_string(),
                    message,
                })
            }
        };
        Ok(CommandOutput {
            stdout,
            stderr,
            status: exit_status(code),
        })
    }
}

impl CommandRunner for MockRunner {
    fn run_local(&self, dir: &Path, command: &str) -> Result<CommandOutput> {
        self.reply(Invocation::Local {
            dir: dir.to_path_buf(),
            command: command.to_string(),
        })
    }

    fn run_ssh(&self, profile: &ConnectionProfile, command: &str) -> Result<CommandOutput> {
        self.reply(Invocation::Ssh {
            host: profile.hostname.clone(),
            command: command.to_string(),
        })
    }

    fn run_scp(
        &self,
        profile: &ConnectionProfile,
        direction: Direction,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<CommandOutput> {
        let invocation = match direction {
            Direction::Upload => Invocation::Upload {
                host: profile.hostname.clone(),
                local: local_path.to_path_buf(),
                remote: remote_path.to_string(),
            },
            Direction::Download => Invocation::Download {
                host: profile.hostname.clone(),
                remote: remote_path.to_string(),
                local: local_path.to_path_buf(),
            },
        };
        if direction == Direction::Upload {
            let contents = std::fs::read(local_path).unwrap_or_default();
            self.uploaded
                .borrow_mut()
                .push(String::from_utf8_lossy(&contents).into_owned());
        }

        let output = self.reply(invocation)?;
        if direction == Direction::Download && output.status.success() {
            std::fs::write(local_path, &output.stdout)?;
        }
        Ok(output)
    }
}

/// A [`Prompt`] that replays queued answers.
///
/// Panics if asked a question with no answer queued.
#[derive(Default)]
pub struct ScriptedPrompt {
    confirms: RefCell<Vec<bool>>,
    inputs: RefCell<Vec<String>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirming(answers: &[bool]) -> Self {
        let prompt = Self::new();
        prompt.confirms.borrow_mut().extend_from_slice(answers);
        prompt
    }

    pub fn add_input(&self, answer: &str) {
        self.inputs.borrow_mut().push(answer.to_string());
    }

    pub fn add_confirm(&self, answer: bool) {
        self.confirms.borrow_mut().push(answer);
    }

    /// Every question asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str, _default: bool) -> Result<bool> {
        self.asked.borrow_mut().push(question.to_string());
        let mut confirms = self.confirms.borrow_mut();
        assert!(!confirms.is_empty(), "ScriptedPrompt: unexpected confirm: {question}");
        Ok(confirms.remove(0))
    }

    fn input(&self, question: &str) -> Result<String> {
        self.asked.borrow_mut().push(question.to_string());
        let mut inputs = self.inputs.borrow_mut();
        assert!(!inputs.is_empty(), "ScriptedPrompt: unexpected input: {question}");
        Ok(inputs.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::test_profile;

    #[test]
    fn ssh_and_local_calls_share_one_log() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok("staging\n".into()));
        mock.add_response(MockResponse::Ok(String::new()));

        let branch = mock.run_ssh(&test_profile(), "git branch").unwrap();
        mock.run_local(Path::new("/work/shop"), "git status").unwrap();

        assert_eq!(branch.stdout, "staging\n");
        match &mock.invocations()[..] {
            [Invocation::Ssh { host, .. }, Invocation::Local { dir, .. }] => {
                assert_eq!(host, "staging.example.com");
                assert_eq!(dir, &PathBuf::from("/work/shop"));
            }
            other => panic!("unexpected invocations: {other:?}"),
        }
        assert_eq!(mock.commands(), vec!["git branch", "git status"]);
    }

    #[test]
    fn queued_failures_surface_as_status_or_error() {
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Fail("permission denied".into()));
        mock.add_response(MockResponse::Err("ssh not found".into()));

        let out = mock.run_ssh(&test_profile(), "rm -rf /var/www/sites/shop").unwrap();
        assert!(!out.status.success());
        assert_eq!(out.stderr, "permission denied");
        assert!(mock.run_local(Path::new("/"), "ssh -V").is_err());
        assert_eq!(mock.remaining_responses(), 0);
    }

    #[test]
    fn download_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("dump.sql");
        let mock = MockRunner::new();
        mock.add_response(MockResponse::Ok("CREATE TABLE t;".into()));

        mock.run_scp(&test_profile(), Direction::Download, &local, "/tmp/x.sql")
            .unwrap();
        assert_eq!(std::fs::read_to_string(&local).unwrap(), "CREATE TABLE t;");
    }

    #[test]
    #[should_panic(expected = "no more responses queued")]
    fn empty_queue_panics() {
        let mock = MockRunner::new();
        let _ = mock.run_ssh(&test_profile(), "ls");
    }

    #[test]
    fn scripted_prompt_replays_answers() {
        let prompt = ScriptedPrompt::confirming(&[true, false]);
        prompt.add_input("Fix typo");
        assert!(prompt.confirm("first?", false).unwrap());
        assert!(!prompt.confirm("second?", false).unwrap());
        assert_eq!(prompt.input("message").unwrap(), "Fix typo");
        assert_eq!(prompt.asked().len(), 3);
    }
}
