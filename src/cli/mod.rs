use clap::builder::styling::{AnsiColor, Color, Styles};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Custom styles for help output
fn help_styles() -> Styles {
    Styles::styled()
        .header(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .usage(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .literal(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .placeholder(anstyle::Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable output
    #[default]
    Text,
    /// JSON on stdout, including errors
    Json,
}

#[derive(Parser)]
#[command(name = "erk")]
#[command(about = "Pooled git worktrees keyed by issue", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
#[command(styles = help_styles())]
#[command(arg_required_else_help = true)]
#[command(after_long_help = "\
Getting started

  erk checkout 4655            # Worktree for the P4655-… branch
  source \"$(erk checkout)\"     # Enter the worktree of the current issue
  erk wt list                  # Show slots and direct worktrees
  erk land                     # Fast-forward into trunk, clean up")]
pub(crate) struct Cli {
    /// Working directory for this command
    #[arg(
        short = 'C',
        global = true,
        value_name = "path",
        display_order = 100,
        help_heading = "Global Options"
    )]
    pub directory: Option<PathBuf>,

    /// User config file path
    #[arg(
        long,
        global = true,
        value_name = "path",
        display_order = 101,
        help_heading = "Global Options"
    )]
    pub config: Option<PathBuf>,

    /// Show progress (-v) or debug logs (-vv)
    #[arg(
        long,
        short = 'v',
        global = true,
        action = clap::ArgAction::Count,
        display_order = 102,
        help_heading = "Global Options"
    )]
    pub verbose: u8,

    /// Output format
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        display_order = 103,
        help_heading = "Global Options"
    )]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Resolve the issue a command would act on
    ///
    /// Tries, in order: the explicit argument, the current branch name
    /// (`P<n>-…`), then `.impl/issue.json` in the working directory.
    Resolve {
        /// Issue number, `#123`, `P123` or an issue URL
        target: Option<String>,

        /// Fail on a malformed metadata file instead of ignoring it
        #[arg(long)]
        strict: bool,
    },

    /// Create or reuse the worktree for an issue's branch
    ///
    /// Prints the activation script path on stdout, so
    /// `source "$(erk checkout 4655)"` enters the worktree.
    Checkout {
        /// Issue number, `#123`, `P123` or an issue URL
        target: Option<String>,

        /// Create a direct worktree instead of taking a pool slot
        #[arg(long)]
        no_slot: bool,
    },

    /// Manage worktrees
    #[command(subcommand)]
    Wt(WtCommand),

    /// Fast-forward a branch into trunk, then remove its worktree and branch
    ///
    /// Every confirmation is asked before anything changes.
    Land {
        /// Branch to land (defaults to the current branch)
        branch: Option<String>,

        /// Branch to fast-forward (defaults to the configured trunk)
        #[arg(long)]
        target: Option<String>,

        /// Keep the branch after landing
        #[arg(long)]
        keep_branch: bool,

        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect the slot pool
    #[command(subcommand)]
    Slot(SlotCommand),
}

#[derive(Subcommand)]
pub(crate) enum WtCommand {
    /// Create (or locate) a worktree for a branch
    ///
    /// Creates the branch from `--base` (or HEAD) when it does not exist.
    Create {
        branch: String,

        /// Start point for a new branch
        #[arg(long)]
        base: Option<String>,

        /// Create a direct worktree instead of taking a pool slot
        #[arg(long)]
        no_slot: bool,
    },

    /// Remove a branch's worktree and release its slot
    Remove {
        branch: String,

        /// Discard uncommitted changes and delete unmerged branches
        #[arg(short, long)]
        force: bool,

        /// Keep the branch
        #[arg(long)]
        keep_branch: bool,

        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List pool slots and direct worktrees
    List,

    /// Write a named script into a worktree for later sourcing
    Defer {
        branch: String,

        /// Script name (letters, digits, `-`, `_`)
        name: String,

        /// Command to run from the worktree root
        #[arg(last = true, required = true, value_name = "CMD")]
        command: Vec<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum SlotCommand {
    /// Report registry entries that disagree with the filesystem
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defer_takes_trailing_command() {
        let cli = Cli::try_parse_from(["erk", "wt", "defer", "feat", "tests", "--", "make", "-j4"])
            .unwrap();
        match cli.command {
            Commands::Wt(WtCommand::Defer {
                branch,
                name,
                command,
            }) => {
                assert_eq!(branch, "feat");
                assert_eq!(name, "tests");
                assert_eq!(command, ["make", "-j4"]);
            }
            _ => panic!("expected wt defer"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["erk", "wt", "list", "--format", "json", "-vv"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
    }
}
