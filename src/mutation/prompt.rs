//! Where confirmation answers come from.

use std::collections::VecDeque;
use std::io::{self, IsTerminal, Write};

use color_print::cformat;

use crate::error::ErkError;
use crate::styling::{eprint, prompt_message};

/// Answers yes/no questions during the validating phase.
pub trait Prompter {
    /// Ask `question`; `default` is the answer for an empty reply.
    fn confirm(&mut self, question: &str, default: bool) -> anyhow::Result<bool>;
}

/// Asks on stderr and reads the answer from stdin.
///
/// Refuses with `NotInteractive` when stdin is not a terminal, so a piped
/// invocation never blocks on a question nobody can see.
#[derive(Debug, Default)]
pub struct InteractivePrompter;

impl Prompter for InteractivePrompter {
    fn confirm(&mut self, question: &str, default: bool) -> anyhow::Result<bool> {
        if !io::stdin().is_terminal() {
            return Err(ErkError::NotInteractive {
                question: question.to_string(),
            }
            .into());
        }

        let choices = if default { "[Y/n]" } else { "[y/N]" };
        eprint!("{} ", prompt_message(cformat!("{question} <bold>{choices}</>")));
        io::stderr().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;
        let response = response.trim();
        if response.is_empty() {
            return Ok(default);
        }
        Ok(response.eq_ignore_ascii_case("y") || response.eq_ignore_ascii_case("yes"))
    }
}

/// Answers every question with yes (`--yes`).
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&mut self, question: &str, _default: bool) -> anyhow::Result<bool> {
        log::info!("Assuming yes: {question}");
        Ok(true)
    }
}

/// Replays a fixed list of answers and records the questions asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<bool>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str, _default: bool) -> anyhow::Result<bool> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("No scripted answer left for question: {question}"))
    }
}
