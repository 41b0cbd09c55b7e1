//! Scripted prompter for menu tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::prompt::{PromptError, Prompter};

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Select(usize),
    Text(String),
    Confirm(bool),
}

/// Answers prompts from a fixed script and records every printed line.
///
/// A prompt whose kind does not match the next answer panics.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    lines: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn said(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
    }

    fn next(&self, prompt: &str) -> Result<Answer, PromptError> {
        self.lines.lock().unwrap().push(format!("? {prompt}"));
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(PromptError::Exhausted)
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        match self.next(prompt)? {
            Answer::Select(index) => {
                assert!(index < items.len(), "{prompt}: no item {index} in {items:?}");
                Ok(index)
            }
            other => panic!("{prompt}: expected a selection, got {other:?}"),
        }
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        match self.next(prompt)? {
            Answer::Text(text) if text.is_empty() => Ok(default.unwrap_or_default().to_owned()),
            Answer::Text(text) => Ok(text),
            other => panic!("{prompt}: expected text, got {other:?}"),
        }
    }

    fn password(&self, prompt: &str) -> Result<String, PromptError> {
        self.input(prompt, None)
    }

    fn confirm(&self, prompt: &str) -> Result<bool, PromptError> {
        match self.next(prompt)? {
            Answer::Confirm(yes) => Ok(yes),
            other => panic!("{prompt}: expected a confirmation, got {other:?}"),
        }
    }

    fn pause(&self) -> Result<(), PromptError> {
        Ok(())
    }

    fn say(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_owned());
    }

    fn clear(&self) {}
}
