//! Consolidated styling module for terminal output.
//!
//! This module uses the anstyle ecosystem:
//! - anstream for auto-detecting color support
//! - anstyle for composable styling
//! - color-print (`cformat!`) for message text
//!
//! ## stdout vs stderr principle
//!
//! - **stdout**: Primary data output (script paths, JSON, slot tables)
//! - **stderr**: Status messages (progress, success, errors, hints, warnings)
//!
//! Callers routinely run `source "$(erk checkout 123)"`, so anything other than
//! the primary result must stay off stdout.

mod constants;
mod format;
mod suggest;

// Re-exports from anstream (auto-detecting output)
pub use anstream::{eprint, eprintln, print, println, stderr, stdout};

// Re-exports from anstyle (for composition)
pub use anstyle::Style as AnstyleStyle;

pub use constants::*;
pub use format::{GUTTER_OVERHEAD, format_with_gutter};
pub use suggest::suggest_command;

use std::sync::atomic::{AtomicU8, Ordering};

/// Global verbosity level, set at startup.
/// 0 = normal, 1 = verbose (-v), 2+ = debug (-vv)
static VERBOSITY: AtomicU8 = AtomicU8::new(0);

/// Set the global verbosity level.
///
/// Call this once at startup after parsing CLI arguments.
pub fn set_verbosity(level: u8) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

/// Get the current verbosity level.
pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

/// Get terminal width, or `usize::MAX` if detection fails.
///
/// Checks stderr first (status messages go there), then stdout, then `COLUMNS`.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) =
        terminal_size::terminal_size_of(std::io::stderr()).or_else(terminal_size::terminal_size)
    {
        return w as usize;
    }

    if let Ok(cols) = std::env::var("COLUMNS")
        && let Ok(width) = cols.parse::<usize>()
    {
        return width;
    }

    usize::MAX
}

/// Calculate visual width of a string, ignoring ANSI escape codes
pub fn visual_width(s: &str) -> usize {
    use ansi_str::AnsiStr;
    use unicode_width::UnicodeWidthStr;
    s.ansi_strip().width()
}
