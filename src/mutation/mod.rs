//! Two-phase mutation protocol
//!
//! Commands that change several things (merge a branch, delete a worktree,
//! delete a branch) run as a list of [`Step`]s in two phases:
//!
//! 1. **Validating**: every step checks its preconditions and asks its
//!    questions through the [`Prompter`]. No side effects. Answers collect
//!    into a [`ConfirmationRecord`].
//! 2. **Executing**: every step runs in order with the frozen record. No
//!    prompter is available, so nothing can stop halfway to ask.
//!
//! Declining a required question, or any precondition failing, ends the run
//! before the first mutation. A failure while executing stops immediately
//! and reports which steps already completed; nothing is rolled back.

mod prompt;

use std::collections::BTreeMap;

use ansi_str::AnsiStr;
use serde::Serialize;

pub use prompt::{AssumeYes, InteractivePrompter, Prompter, ScriptedPrompter};

use crate::error::ErkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Yes,
    No,
}

impl From<bool> for Decision {
    fn from(value: bool) -> Self {
        if value { Decision::Yes } else { Decision::No }
    }
}

/// Decisions gathered while validating, keyed by name. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmationRecord {
    decisions: BTreeMap<String, Decision>,
}

impl ConfirmationRecord {
    pub fn get(&self, key: &str) -> Option<Decision> {
        self.decisions.get(key).copied()
    }

    /// `true` only for an explicit yes.
    pub fn approved(&self, key: &str) -> bool {
        self.get(key) == Some(Decision::Yes)
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Handed to [`Step::validate`]; the only way to ask the user anything.
pub struct Validator<'a> {
    prompter: &'a mut dyn Prompter,
    decisions: BTreeMap<String, Decision>,
    step: String,
}

impl<'a> Validator<'a> {
    fn new(prompter: &'a mut dyn Prompter) -> Self {
        Self {
            prompter,
            decisions: BTreeMap::new(),
            step: String::new(),
        }
    }

    /// Ask `question` and record the answer under `key`.
    ///
    /// When `required` is set, a "no" aborts the whole run.
    pub fn confirm(&mut self, key: &str, question: &str, required: bool) -> anyhow::Result<Decision> {
        let decision = Decision::from(self.prompter.confirm(question, !required)?);
        log::debug!("[{}] {key}: {decision:?}", self.step);
        self.decisions.insert(key.to_string(), decision);
        if required && decision == Decision::No {
            return Err(self.abort(format!("declined \"{question}\"")));
        }
        Ok(decision)
    }

    /// Record a decision without asking (e.g. from a command-line flag).
    pub fn decide(&mut self, key: &str, decision: Decision) {
        self.decisions.insert(key.to_string(), decision);
    }

    /// Abort unless `condition` holds.
    pub fn require(&self, condition: bool, reason: impl Into<String>) -> anyhow::Result<()> {
        if condition {
            Ok(())
        } else {
            Err(self.abort(reason))
        }
    }

    pub fn abort(&self, reason: impl Into<String>) -> anyhow::Error {
        ErkError::ValidationAborted {
            step: self.step.clone(),
            reason: reason.into(),
        }
        .into()
    }

    fn finish(self) -> ConfirmationRecord {
        ConfirmationRecord {
            decisions: self.decisions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    /// The record said not to; nothing changed
    Skipped,
}

/// One mutation in a two-phase plan.
pub trait Step<C: ?Sized> {
    fn name(&self) -> &str;

    /// Check preconditions and ask questions. Must not change anything.
    fn validate(&self, ctx: &C, validator: &mut Validator<'_>) -> anyhow::Result<()>;

    /// Perform the mutation according to `record`.
    fn execute(&self, ctx: &C, record: &ConfirmationRecord) -> anyhow::Result<StepOutcome>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    pub record: ConfirmationRecord,
}

/// Validate every step, then execute every step.
pub fn run_two_phase<C: ?Sized>(
    steps: &[&dyn Step<C>],
    ctx: &C,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<ExecutionReport> {
    let mut validator = Validator::new(prompter);
    for step in steps {
        validator.step = step.name().to_string();
        log::debug!("Validating {}", step.name());
        step.validate(ctx, &mut validator)
            .map_err(|e| as_validation_error(step.name(), e))?;
    }
    let record = validator.finish();

    let mut report = ExecutionReport {
        record,
        ..ExecutionReport::default()
    };
    for step in steps {
        log::debug!("Executing {}", step.name());
        match step.execute(ctx, &report.record) {
            Ok(StepOutcome::Done) => report.completed.push(step.name().to_string()),
            Ok(StepOutcome::Skipped) => report.skipped.push(step.name().to_string()),
            Err(e) => {
                return Err(ErkError::ExecutionFailed {
                    step: step.name().to_string(),
                    completed: report.completed,
                    error: format!("{e:#}"),
                }
                .into());
            }
        }
    }
    Ok(report)
}

/// Errors out of `validate` all mean "abort before mutating"; keep the ones
/// that already say so and fold the rest into `ValidationAborted`.
fn as_validation_error(step: &str, err: anyhow::Error) -> anyhow::Error {
    if let Some(
        ErkError::ValidationAborted { .. } | ErkError::NotInteractive { .. },
    ) = err.downcast_ref::<ErkError>()
    {
        return err;
    }
    let plain = err.to_string().ansi_strip().into_owned();
    let reason = plain
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches(['✗', ' '])
        .to_string();
    ErkError::ValidationAborted {
        step: step.to_string(),
        reason,
    }
    .into()
}
