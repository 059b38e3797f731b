//! User prompts: yes/no confirmations and free-text input.
//!
//! Commands take a `&dyn Prompt` so tests can script answers; the binary uses
//! [`TerminalPrompt`], backed by dialoguer.

use crate::error::Result;

pub trait Prompt {
    /// Asks a yes/no question.
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;

    /// Asks for a line of text.
    fn input(&self, question: &str) -> Result<String>;
}

/// Interactive prompt on the controlling terminal.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        let answer = dialoguer::Confirm::new()
            .with_prompt(question)
            .default(default)
            .interact()
            .map_err(std::io::Error::other)?;
        Ok(answer)
    }

    fn input(&self, question: &str) -> Result<String> {
        let answer: String = dialoguer::Input::new()
            .with_prompt(question)
            .interact_text()
            .map_err(std::io::Error::other)?;
        Ok(answer)
    }
}

/// Answers every confirmation with yes. Used for `--yes`.
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn confirm(&self, _question: &str, _default: bool) -> Result<bool> {
        Ok(true)
    }

    fn input(&self, question: &str) -> Result<String> {
        TerminalPrompt.input(question)
    }
}
