//! Command suggestion helpers for hint messages.
//!
//! ```
//! use erk::styling::suggest_command;
//!
//! let cmd = suggest_command("wt remove", &["feat-a"], &["--force"]);
//! assert_eq!(cmd, "erk wt remove feat-a --force");
//!
//! // Branch starting with dash gets a -- separator
//! let cmd = suggest_command("wt remove", &["-bugfix"], &[]);
//! assert_eq!(cmd, "erk wt remove -- -bugfix");
//! ```

use shell_escape::escape;
use std::borrow::Cow;

/// Build a copy-pasteable `erk` command for hints.
///
/// `subcommand` may contain spaces (`"wt create"`); it is not escaped.
/// Positional `args` are POSIX-quoted, and a `--` separator precedes the first
/// argument that starts with `-`.
pub fn suggest_command(subcommand: &str, args: &[&str], flags: &[&str]) -> String {
    let mut parts = vec!["erk".to_string(), subcommand.to_string()];

    let mut separator_inserted = false;
    for arg in args {
        if arg.starts_with('-') && !separator_inserted {
            parts.push("--".to_string());
            separator_inserted = true;
        }
        parts.push(escape(Cow::Borrowed(*arg)).into_owned());
    }

    parts.extend(flags.iter().map(|s| s.to_string()));
    parts.join(" ")
}
