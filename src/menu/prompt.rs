//! Terminal questions and output, behind a trait so menus can be scripted.

use std::io::{Write, stdout};

use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use dialoguer::{Confirm, Input, Password, Select};
use thiserror::Error;
use tokio::task::block_in_place;

/// Errors raised by an interactive prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("No more input")]
    Exhausted,
}

impl From<dialoguer::Error> for PromptError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Terminal(err.to_string())
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        Self::Terminal(err.to_string())
    }
}

/// Asks the user questions and shows them status lines.
pub trait Prompter: Send + Sync {
    /// Lets the user pick one of `items`; returns its index.
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError>;

    /// Reads a line of text, pre-filled with `default` if given.
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Reads a secret without echoing it.
    fn password(&self, prompt: &str) -> Result<String, PromptError>;

    /// Asks a yes/no question (defaults to no).
    fn confirm(&self, prompt: &str) -> Result<bool, PromptError>;

    /// Waits until the user is done reading the output.
    fn pause(&self) -> Result<(), PromptError>;

    /// Prints one status line.
    fn say(&self, line: &str);

    /// Clears the screen before a new menu frame.
    fn clear(&self);
}

/// [`Prompter`] backed by `dialoguer` on the real terminal.
///
/// Prompts block the calling worker thread, so this must run on the
/// multi-threaded runtime; the spam loop keeps running on the others.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        block_in_place(|| {
            Select::new()
                .with_prompt(prompt)
                .items(items)
                .default(0)
                .interact()
                .map_err(PromptError::from)
        })
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        block_in_place(|| {
            let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
            if let Some(default) = default {
                input = input.default(default.to_owned());
            }
            input.interact_text().map_err(PromptError::from)
        })
    }

    fn password(&self, prompt: &str) -> Result<String, PromptError> {
        block_in_place(|| {
            Password::new()
                .with_prompt(prompt)
                .interact()
                .map_err(PromptError::from)
        })
    }

    fn confirm(&self, prompt: &str) -> Result<bool, PromptError> {
        block_in_place(|| {
            Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .map_err(PromptError::from)
        })
    }

    fn pause(&self) -> Result<(), PromptError> {
        block_in_place(|| {
            Input::<String>::new()
                .with_prompt("Press Enter to return to the menu")
                .allow_empty(true)
                .interact_text()
                .map(drop)
                .map_err(PromptError::from)
        })
    }

    fn say(&self, line: &str) {
        println!("{line}");
    }

    fn clear(&self) {
        let mut out = stdout();
        if let Err(e) = execute!(out, Clear(ClearType::All), MoveTo(0, 0)) {
            tracing::debug!("Failed to clear screen: {}", e);
        }
        let _ = out.flush();
    }
}
