//! Git error types and formatting
//!
//! **`GitError`** is a typed enum for failures of the version-control
//! collaborator. Use `.into()` to convert to `anyhow::Error` while preserving
//! the type for pattern matching; Display produces styled output for users.

use std::path::PathBuf;

use color_print::cformat;

use crate::path::format_path_for_display;
use crate::styling::{error_message, format_with_gutter, hint_message, suggest_command};

/// Domain errors for git and worktree operations.
///
/// ```
/// use erk::git::GitError;
///
/// let err: anyhow::Error = GitError::BranchNotFound { branch: "feat-a".into() }.into();
/// assert!(matches!(
///     err.downcast_ref::<GitError>(),
///     Some(GitError::BranchNotFound { .. })
/// ));
/// ```
#[derive(Debug, Clone)]
pub enum GitError {
    /// A git subprocess exited non-zero
    CommandFailed {
        command: String,
        error: String,
    },
    DetachedHead {
        action: Option<String>,
    },
    BranchNotFound {
        branch: String,
    },
    UncommittedChanges {
        branch: String,
        path: PathBuf,
    },
    NotFastForward {
        branch: String,
        target: String,
    },
    ParseError {
        message: String,
    },
    Other {
        message: String,
    },
}

impl std::error::Error for GitError {}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::CommandFailed { command, error } => {
                let header = error_message(cformat!("<bold>{command}</> failed"));
                write!(f, "{}", format_error_block(header, error))
            }

            GitError::DetachedHead { action } => {
                let message = match action {
                    Some(action) => format!("Cannot {action}: not on a branch (detached HEAD)"),
                    None => "Not on a branch (detached HEAD)".to_string(),
                };
                write!(
                    f,
                    "{}\n{}",
                    error_message(&message),
                    hint_message(cformat!(
                        "Pass the target explicitly, or run <bright-black>git switch <<branch>></> first"
                    ))
                )
            }

            GitError::BranchNotFound { branch } => {
                let create_cmd = suggest_command("wt create", &[branch], &[]);
                write!(
                    f,
                    "{}\n{}",
                    error_message(cformat!("No branch named <bold>{branch}</>")),
                    hint_message(cformat!(
                        "To create it in a slot, run <bright-black>{create_cmd}</>"
                    ))
                )
            }

            GitError::UncommittedChanges { branch, path } => {
                let path_display = format_path_for_display(path);
                let force_cmd = suggest_command("wt remove", &[branch], &["--force"]);
                write!(
                    f,
                    "{}\n{}",
                    error_message(cformat!(
                        "<bold>{branch}</> has uncommitted changes at <bold>{path_display}</>"
                    )),
                    hint_message(cformat!(
                        "Commit or stash changes first, or to discard them, run <bright-black>{force_cmd}</>"
                    ))
                )
            }

            GitError::NotFastForward { branch, target } => write!(
                f,
                "{}\n{}",
                error_message(cformat!(
                    "<bold>{target}</> cannot be fast-forwarded to <bold>{branch}</>"
                )),
                hint_message(cformat!(
                    "Rebase first: <bright-black>git rebase {target} {branch}</>"
                ))
            ),

            GitError::ParseError { message } => write!(f, "{}", error_message(message)),

            GitError::Other { message } => write!(f, "{}", error_message(message)),
        }
    }
}

/// Header line followed by the detail text in a gutter; the gutter is omitted
/// when the detail is empty.
pub(crate) fn format_error_block(header: impl Into<String>, error: &str) -> String {
    let header = header.into();
    let trimmed = error.trim();
    if trimmed.is_empty() {
        header
    } else {
        format!("{header}\n{}", format_with_gutter(trimmed, None))
    }
}

#[cfg(test)]
mod tests {
    use ansi_str::AnsiStr;
    use insta::assert_snapshot;

    use super::*;

    fn plain(err: &GitError) -> String {
        err.to_string().ansi_strip().into_owned()
    }

    #[test]
    fn into_preserves_type_for_display() {
        let err: anyhow::Error = GitError::BranchNotFound {
            branch: "feat-a".into(),
        }
        .into();

        let downcast = err.downcast_ref::<GitError>().expect("Should downcast");
        assert_snapshot!(plain(downcast), @r"
        ✗ No branch named feat-a
        ↳ To create it in a slot, run erk wt create feat-a
        ");
    }

    #[test]
    fn detached_head_with_action() {
        let err = GitError::DetachedHead {
            action: Some("resolve target".into()),
        };
        assert!(plain(&err).starts_with("✗ Cannot resolve target: not on a branch (detached HEAD)"));
    }

    #[test]
    fn uncommitted_changes_suggests_force() {
        let err = GitError::UncommittedChanges {
            branch: "feat-a".into(),
            path: PathBuf::from("/tmp/pool/slots/slot-00"),
        };
        assert!(plain(&err).contains("erk wt remove feat-a --force"));
    }

    #[test]
    fn command_failed_quotes_stderr() {
        let err = GitError::CommandFailed {
            command: "git worktree add".into(),
            error: "fatal: 'feat-a' is already checked out".into(),
        };
        let text = plain(&err);
        assert!(text.starts_with("✗ git worktree add failed\n"));
        assert!(text.contains("fatal: 'feat-a' is already checked out"));
    }

    #[test]
    fn format_error_block_skips_empty_detail() {
        assert_eq!(format_error_block("header", "  \n"), "header");
    }
}
