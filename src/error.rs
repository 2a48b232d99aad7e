//! erk error types
//!
//! **`ErkError`** covers the slot pool, resolver, lifecycle and mutation
//! protocol. Like [`GitError`](crate::git::GitError) it is a typed enum with a
//! styled `Display`: first line says what failed, the `↳` line says what to do
//! next. Convert with `.into()` and recover with `downcast_ref`.

use std::path::PathBuf;
use std::time::Duration;

use color_print::cformat;

use crate::config::ConfigError;
use crate::git::{GitError, format_error_block};
use crate::path::format_path_for_display;
use crate::styling::{error_message, hint_message, info_message, suggest_command};

#[derive(Debug, Clone, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ErkError {
    /// No resolution tier produced a target
    ResolutionFailed {
        /// Branch inspected by the branch-name tier (`None` when detached)
        branch: Option<String>,
        /// Metadata file consulted by the metadata tier
        metadata_path: PathBuf,
    },
    /// An explicit target argument did not match any accepted form
    InvalidTarget {
        input: String,
    },
    /// Metadata file exists but is unusable (strict resolution only)
    MetadataInvalid {
        path: PathBuf,
        reason: String,
    },
    /// No local branch follows the `P<issue>-` convention
    NoBranchForIssue {
        issue: u64,
    },
    PoolExhausted {
        branch: String,
        capacity: usize,
        /// `(slot index, branch)` for every occupied slot
        occupants: Vec<(usize, String)>,
    },
    CheckoutFailed {
        branch: String,
        /// `None` for a direct (unpooled) worktree
        slot: Option<usize>,
        path: PathBuf,
        error: String,
    },
    /// A worktree already at the target path holds a different branch
    SlotBranchMismatch {
        slot: Option<usize>,
        path: PathBuf,
        expected: String,
        found: Option<String>,
    },
    ValidationAborted {
        step: String,
        reason: String,
    },
    ExecutionFailed {
        step: String,
        completed: Vec<String>,
        error: String,
    },
    RegistryBusy {
        path: PathBuf,
        waited: Duration,
    },
    RegistryCorrupt {
        path: PathBuf,
        error: String,
    },
    NotInteractive {
        question: String,
    },
    BranchHasNoWorktree {
        branch: String,
    },
    InvalidScriptName {
        name: String,
    },
}

impl std::error::Error for ErkError {}

impl std::fmt::Display for ErkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErkError::ResolutionFailed {
                branch,
                metadata_path,
            } => {
                let branch_note = match branch {
                    Some(b) => cformat!("branch <bold>{b}</> has no <bold>P<<n>>-</> prefix"),
                    None => "HEAD is detached".to_string(),
                };
                let metadata = format_path_for_display(metadata_path);
                write!(
                    f,
                    "{}\n{}\n{}\n{}\n{}",
                    error_message("Could not determine a target"),
                    info_message("explicit argument: none given"),
                    info_message(cformat!("branch name: {branch_note}")),
                    info_message(cformat!(
                        "metadata: no usable issue number in <bold>{metadata}</>"
                    )),
                    hint_message(cformat!(
                        "Pass the target explicitly, e.g. <bright-black>{}</>",
                        suggest_command("checkout", &["4655"], &[])
                    ))
                )
            }

            ErkError::InvalidTarget { input } => write!(
                f,
                "{}\n{}",
                error_message(cformat!("<bold>{input}</> is not a valid target")),
                hint_message(cformat!(
                    "Use an issue number (<bright-black>123</>, <bright-black>#123</>, <bright-black>P123</>) or an issue URL"
                ))
            ),

            ErkError::MetadataInvalid { path, reason } => {
                let path = format_path_for_display(path);
                write!(
                    f,
                    "{}\n{}",
                    error_message(cformat!("Malformed issue metadata in <bold>{path}</>: {reason}")),
                    hint_message(cformat!(
                        "Expected a JSON object like <bright-black>{{\"issue_number\": 123}}</>"
                    ))
                )
            }

            ErkError::NoBranchForIssue { issue } => write!(
                f,
                "{}\n{}",
                error_message(cformat!("No local branch for issue <bold>#{issue}</>")),
                hint_message(cformat!(
                    "Create one with <bright-black>{} P{issue}-<<slug>></>",
                    suggest_command("wt create", &[], &[])
                ))
            ),

            ErkError::PoolExhausted {
                branch,
                capacity,
                occupants,
            } => {
                let slots = occupants
                    .iter()
                    .map(|(index, b)| format!("slot-{index:02}: {b}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                let header = error_message(cformat!(
                    "All {capacity} slots are occupied; cannot allocate one for <bold>{branch}</>"
                ));
                let release_cmd = suggest_command("wt remove", &[], &[]);
                let direct_cmd = suggest_command("wt create", &[branch], &["--no-slot"]);
                write!(
                    f,
                    "{}\n{}",
                    format_error_block(header, &slots),
                    hint_message(cformat!(
                        "Release a slot with <bright-black>{release_cmd} <<branch>></>, or bypass the pool with <bright-black>{direct_cmd}</>"
                    ))
                )
            }

            ErkError::CheckoutFailed {
                branch,
                slot,
                path,
                error,
            } => {
                let path = format_path_for_display(path);
                let header = error_message(cformat!(
                    "Failed to create worktree for <bold>{branch}</> at <bold>{path}</>"
                ));
                let hint = match slot {
                    Some(index) => format!("Slot {index} was not assigned; fix the error above and retry"),
                    None => "Nothing was created; fix the error above and retry".to_string(),
                };
                write!(
                    f,
                    "{}\n{}",
                    format_error_block(header, error),
                    hint_message(hint)
                )
            }

            ErkError::SlotBranchMismatch {
                slot,
                path,
                expected,
                found,
            } => {
                let path = format_path_for_display(path);
                let location = match slot {
                    Some(index) => format!("Slot {index} ({path})"),
                    None => path,
                };
                let found = found.as_deref().unwrap_or("a detached HEAD");
                write!(
                    f,
                    "{}\n{}",
                    error_message(cformat!(
                        "{location} has <bold>{found}</> checked out, expected <bold>{expected}</>"
                    )),
                    hint_message(cformat!(
                        "Inspect the pool with <bright-black>{}</>",
                        suggest_command("slot check", &[], &[])
                    ))
                )
            }

            ErkError::ValidationAborted { step, reason } => write!(
                f,
                "{}\n{}",
                error_message(cformat!("Aborted at <bold>{step}</>: {reason}")),
                hint_message("Nothing was changed")
            ),

            ErkError::ExecutionFailed {
                step,
                completed,
                error,
            } => {
                let header = error_message(cformat!("Step <bold>{step}</> failed"));
                let done = if completed.is_empty() {
                    "No earlier steps had run".to_string()
                } else {
                    format!("Already completed: {}", completed.join(", "))
                };
                write!(
                    f,
                    "{}\n{}",
                    format_error_block(header, error),
                    hint_message(cformat!("{done}; finish the remaining steps by hand"))
                )
            }

            ErkError::RegistryBusy { path, waited } => {
                let path = format_path_for_display(path);
                write!(
                    f,
                    "{}\n{}",
                    error_message(cformat!(
                        "Slot registry <bold>{path}</> is locked by another erk process"
                    )),
                    hint_message(format!(
                        "Gave up after {:.1}s; retry once the other command finishes",
                        waited.as_secs_f64()
                    ))
                )
            }

            ErkError::RegistryCorrupt { path, error } => {
                let path = format_path_for_display(path);
                let header =
                    error_message(cformat!("Slot registry <bold>{path}</> could not be read"));
                write!(
                    f,
                    "{}\n{}",
                    format_error_block(header, error),
                    hint_message("Fix or delete the file; erk never rewrites a registry it cannot parse")
                )
            }

            ErkError::NotInteractive { question } => write!(
                f,
                "{}\n{}",
                error_message(cformat!("Cannot ask <bold>{question}</>: stdin is not a terminal")),
                hint_message(cformat!("To proceed without prompting, pass <bright-black>--yes</>"))
            ),

            ErkError::BranchHasNoWorktree { branch } => write!(
                f,
                "{}\n{}",
                error_message(cformat!("Branch <bold>{branch}</> has no worktree")),
                hint_message(cformat!(
                    "List managed worktrees with <bright-black>{}</>",
                    suggest_command("wt list", &[], &[])
                ))
            ),

            ErkError::InvalidScriptName { name } => write!(
                f,
                "{}\n{}",
                error_message(cformat!("<bold>{name}</> is not a valid script name")),
                hint_message("Use letters, digits, '-' or '_'; 'activate' is reserved")
            ),
        }
    }
}

/// Stable kebab-case code for machine-readable output.
///
/// ```
/// use erk::error::{ErkError, error_code};
///
/// let err: anyhow::Error = ErkError::InvalidTarget { input: "abc".into() }.into();
/// assert_eq!(error_code(&err), "invalid-target");
/// ```
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(err) = err.downcast_ref::<ErkError>() {
        return err.into();
    }
    if let Some(err) = err.downcast_ref::<GitError>() {
        return match err {
            GitError::CommandFailed { .. } => "git-command-failed",
            GitError::DetachedHead { .. } => "detached-head",
            GitError::BranchNotFound { .. } => "branch-not-found",
            GitError::UncommittedChanges { .. } => "uncommitted-changes",
            GitError::NotFastForward { .. } => "not-fast-forward",
            GitError::ParseError { .. } => "git-parse-error",
            GitError::Other { .. } => "git-error",
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return "config-error";
    }
    "error"
}
