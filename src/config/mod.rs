//! Configuration system for erk
//!
//! erk reads two independent TOML files.
//!
//! # User Config (~/.config/erk/config.toml)
//!
//! Personal preferences, not checked into git: where the worktree pool lives
//! (`worktrees-dir`), how many slots it has (`pool-size`) and how long to wait
//! for the registry lock (`lock-timeout-ms`).
//!
//! # Project Config (`<repo>`/.erk/config.toml)
//!
//! Checked into the repository: the trunk branch, `post-create` commands and
//! the environment settings baked into activation scripts.
//!
//! `pool-size` may appear in both; the user value wins.

mod commands;
mod expansion;
mod project;
mod user;

use std::path::PathBuf;

use color_print::cformat;

pub use commands::{Command, CommandConfig};
pub use expansion::{TEMPLATE_VARS, expand_template};
pub use project::{PROJECT_CONFIG_RELATIVE_PATH, ProjectConfig};
pub use user::{UserConfig, get_config_path, set_config_path};

use crate::git::format_error_block;
use crate::path::format_path_for_display;
use crate::styling::error_message;

/// Failure to read or parse a config file.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Read { path: PathBuf, error: String },
    Parse { path: PathBuf, error: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, error } => {
                let header = error_message(cformat!(
                    "Failed to read <bold>{}</>",
                    format_path_for_display(path)
                ));
                write!(f, "{}", format_error_block(header, error))
            }
            ConfigError::Parse { path, error } => {
                let header = error_message(cformat!(
                    "Invalid config in <bold>{}</>",
                    format_path_for_display(path)
                ));
                write!(f, "{}", format_error_block(header, error))
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use ansi_str::AnsiStr;

    #[test]
    fn parse_error_display() {
        let err = ConfigError::Parse {
            path: PathBuf::from("/work/.erk/config.toml"),
            error: "invalid type: string \"many\", expected usize".into(),
        };
        let plain = err.to_string().ansi_strip().into_owned();
        assert!(plain.starts_with("✗ Invalid config in /work/.erk/config.toml"));
        assert!(plain.contains("expected usize"));
    }
}
