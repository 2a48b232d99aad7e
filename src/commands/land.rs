use color_print::cformat;
use erk::git::GitError;
use erk::mutation::{ConfirmationRecord, Step, StepOutcome, Validator, run_two_phase};
use erk::styling::{eprintln, progress_message};

use super::context::CommandEnv;
use super::prompter;
use super::worktree::{DeleteBranchStep, RemovalContext, RemoveWorktreeStep, report_execution};
use crate::cli::OutputFormat;

pub(crate) const FAST_FORWARD: &str = "fast-forward";

pub(crate) struct LandOptions {
    pub branch: Option<String>,
    pub target: Option<String>,
    pub keep_branch: bool,
    pub yes: bool,
}

/// Fast-forward trunk onto the branch being landed.
struct FastForwardStep;

impl<'a> Step<RemovalContext<'a>> for FastForwardStep {
    fn name(&self) -> &str {
        FAST_FORWARD
    }

    fn validate(&self, ctx: &RemovalContext<'a>, validator: &mut Validator<'_>) -> anyhow::Result<()> {
        let repo = ctx.manager.vcs();
        validator.require(
            ctx.branch != ctx.trunk,
            format!("{} is the trunk; nothing to land", ctx.branch),
        )?;
        for branch in [ctx.branch, ctx.trunk.as_str()] {
            if !repo.local_branch_exists(branch)? {
                return Err(GitError::BranchNotFound {
                    branch: branch.to_string(),
                }
                .into());
            }
        }
        validator.require(
            repo.is_ancestor(&ctx.trunk, ctx.branch)?,
            format!(
                "{} has commits not on {}; rebase before landing",
                ctx.trunk, ctx.branch
            ),
        )?;
        validator.confirm(
            FAST_FORWARD,
            &format!("Fast-forward {} to {}?", ctx.trunk, ctx.branch),
            true,
        )?;
        Ok(())
    }

    fn execute(&self, ctx: &RemovalContext<'a>, _record: &ConfirmationRecord) -> anyhow::Result<StepOutcome> {
        ctx.manager.vcs().fast_forward(&ctx.trunk, ctx.branch)?;
        Ok(StepOutcome::Done)
    }
}

/// Merge a finished branch into trunk, then tear down its worktree and
/// branch. Every question is asked before the first change is made.
pub(crate) fn handle_land(options: LandOptions, format: OutputFormat) -> anyhow::Result<()> {
    let env = CommandEnv::load()?;
    let branch = match options.branch {
        Some(branch) => branch,
        None => env.repo.require_current_branch("land")?,
    };
    let trunk = match options.target {
        Some(target) => target,
        None => env.trunk()?,
    };
    let manager = env.manager()?;
    let worktree = manager.locate(&branch)?;
    log::debug!(
        "Landing {branch} onto {trunk}, worktree: {:?}",
        worktree.as_ref().map(|w| &w.path)
    );

    let ctx = RemovalContext {
        manager: &manager,
        branch: &branch,
        worktree,
        trunk,
        force: false,
    };
    let delete = DeleteBranchStep {
        keep: options.keep_branch,
        merged_by_plan: true,
    };
    let steps: [&dyn Step<RemovalContext<'_>>; 3] = [&FastForwardStep, &RemoveWorktreeStep, &delete];
    if format == OutputFormat::Text {
        eprintln!(
            "{}",
            progress_message(cformat!("Landing <bold>{branch}</> onto <bold>{}</>", ctx.trunk))
        );
    }
    let mut prompter = prompter(options.yes);
    let report = run_two_phase(&steps, &ctx, prompter.as_mut())?;
    report_execution(&report, &ctx, format)
}
