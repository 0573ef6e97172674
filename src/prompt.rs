use std::collections::VecDeque;
use std::io::{self, IsTerminal};
use std::sync::Mutex;

use inquire::{Confirm, Password, PasswordDisplayMode, Text};

use crate::error::Error;

/// Source of interactive answers
pub trait Prompter: Send + Sync {
    /// Free-text question; an empty answer yields `default`
    fn text(&self, question: &str, default: &str) -> Result<String, Error>;

    fn confirm(&self, question: &str, default: bool) -> Result<bool, Error>;

    /// Hidden input for secrets
    fn password(&self, question: &str) -> Result<String, Error>;
}

/// Terminal prompts backed by inquire.
///
/// Without a terminal on stdin every question fails with `Error::Prompt`
/// instead of waiting for input.
pub struct InquirePrompter;

impl InquirePrompter {
    fn require_terminal(question: &str) -> Result<(), Error> {
        if io::stdin().is_terminal() {
            Ok(())
        } else {
            Err(Error::Prompt(format!(
                "cannot ask '{}': stdin is not a terminal",
                question
            )))
        }
    }
}

impl Prompter for InquirePrompter {
    fn text(&self, question: &str, default: &str) -> Result<String, Error> {
        Self::require_terminal(question)?;
        let mut prompt = Text::new(question);
        if !default.is_empty() {
            prompt = prompt.with_default(default);
        }
        Ok(prompt.prompt()?.trim().to_string())
    }

    fn confirm(&self, question: &str, default: bool) -> Result<bool, Error> {
        Self::require_terminal(question)?;
        Ok(Confirm::new(question).with_default(default).prompt()?)
    }

    fn password(&self, question: &str) -> Result<String, Error> {
        Self::require_terminal(question)?;
        let answer = Password::new(question)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()?;
        Ok(answer.trim().to_string())
    }
}

/// Replays a fixed list of answers, for tests and non-terminal callers.
///
/// Confirm answers are parsed from `y`/`yes`/`n`/`no`; an empty answer takes
/// the question's default. Running out of answers is a prompt error.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self, question: &str) -> Result<String, Error> {
        self.asked.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Prompt(format!("no answer available for '{}'", question)))
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&self, question: &str, default: &str) -> Result<String, Error> {
        let answer = self.next(question)?;
        if answer.trim().is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer.trim().to_string())
        }
    }

    fn confirm(&self, question: &str, default: bool) -> Result<bool, Error> {
        let answer = self.next(question)?;
        match answer.trim().to_lowercase().as_str() {
            "" => Ok(default),
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            other => Err(Error::Prompt(format!("'{}' is not a yes/no answer", other))),
        }
    }

    fn password(&self, question: &str) -> Result<String, Error> {
        Ok(self.next(question)?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_prompter_defaults_and_order() {
        let prompter = ScriptedPrompter::new(["wt-demo", "", "n", ""]);

        assert_eq!(prompter.text("Repository name", "").unwrap(), "wt-demo");
        assert_eq!(prompter.text("Description", "none").unwrap(), "none");
        assert!(!prompter.confirm("Private?", true).unwrap());
        assert!(prompter.confirm("Private?", true).unwrap());
        assert_eq!(prompter.remaining(), 0);
        assert_eq!(prompter.asked().len(), 4);
    }

    #[test]
    fn test_scripted_prompter_exhaustion_is_an_error() {
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        assert!(matches!(prompter.password("Token"), Err(Error::Prompt(_))));
    }

    #[test]
    fn test_scripted_confirm_rejects_garbage() {
        let prompter = ScriptedPrompter::new(["maybe"]);
        assert!(prompter.confirm("Private?", true).is_err());
    }
}
