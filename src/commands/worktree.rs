//! `erk wt` subcommands, plus the removal steps `erk land` reuses.

use std::borrow::Cow;

use color_print::cformat;
use erk::activation;
use erk::git::{Repository, VersionControl};
use erk::lifecycle::{CheckoutOptions, PoolListing, Worktree, WorktreeManager};
use erk::mutation::{ConfirmationRecord, Decision, ExecutionReport, Step, StepOutcome, Validator, run_two_phase};
use erk::path::{format_path_for_display, same_path};
use erk::styling::{eprintln, info_message, println, success_message, visual_width, warning_message};
use serde::Serialize;

use super::context::CommandEnv;
use super::{print_json, prompter, report_worktree};
use crate::cli::OutputFormat;

pub(crate) const REMOVE_WORKTREE: &str = "remove-worktree";
pub(crate) const DELETE_BRANCH: &str = "delete-branch";

/// What the removal steps operate on.
pub(crate) struct RemovalContext<'a> {
    pub manager: &'a WorktreeManager<Repository>,
    pub branch: &'a str,
    pub worktree: Option<Worktree>,
    pub trunk: String,
    /// Discard uncommitted changes, delete unmerged branches
    pub force: bool,
}

/// Remove the branch's worktree and release its slot.
pub(crate) struct RemoveWorktreeStep;

impl<'a> Step<RemovalContext<'a>> for RemoveWorktreeStep {
    fn name(&self) -> &str {
        REMOVE_WORKTREE
    }

    fn validate(&self, ctx: &RemovalContext<'a>, validator: &mut Validator<'_>) -> anyhow::Result<()> {
        let Some(worktree) = &ctx.worktree else {
            validator.decide(REMOVE_WORKTREE, Decision::No);
            return Ok(());
        };
        let path = format_path_for_display(&worktree.path);
        if !ctx.force && ctx.manager.vcs().worktree_exists(&worktree.path)? {
            let dirty = Repository::at(&worktree.path).is_dirty()?;
            validator.require(
                !dirty,
                format!("{path} has uncommitted changes; pass --force to discard them"),
            )?;
        }
        validator.confirm(
            REMOVE_WORKTREE,
            &format!("Remove worktree for {} at {path}?", ctx.branch),
            true,
        )?;
        Ok(())
    }

    fn execute(&self, ctx: &RemovalContext<'a>, record: &ConfirmationRecord) -> anyhow::Result<StepOutcome> {
        let Some(worktree) = &ctx.worktree else {
            return Ok(StepOutcome::Skipped);
        };
        if !record.approved(REMOVE_WORKTREE) {
            return Ok(StepOutcome::Skipped);
        }
        ctx.manager.remove(worktree, ctx.force)?;
        Ok(StepOutcome::Done)
    }
}

/// Delete the local branch.
pub(crate) struct DeleteBranchStep {
    pub keep: bool,
    /// The branch will be merged by an earlier step, so skip the merge check
    pub merged_by_plan: bool,
}

impl<'a> Step<RemovalContext<'a>> for DeleteBranchStep {
    fn name(&self) -> &str {
        DELETE_BRANCH
    }

    fn validate(&self, ctx: &RemovalContext<'a>, validator: &mut Validator<'_>) -> anyhow::Result<()> {
        if self.keep {
            validator.decide(DELETE_BRANCH, Decision::No);
            return Ok(());
        }
        let repo = ctx.manager.vcs();
        // git refuses to delete a branch checked out in a worktree erk won't remove
        if let Some(checked_out) = repo.worktree_for_branch(ctx.branch)?
            && !ctx
                .worktree
                .as_ref()
                .is_some_and(|wt| same_path(&wt.path, &checked_out))
        {
            eprintln!(
                "{}",
                warning_message(cformat!(
                    "<bold>{}</> is checked out at <bold>{}</>; keeping the branch",
                    ctx.branch,
                    format_path_for_display(&checked_out)
                ))
            );
            validator.decide(DELETE_BRANCH, Decision::No);
            return Ok(());
        }
        let merged = self.merged_by_plan || repo.is_ancestor(ctx.branch, &ctx.trunk)?;
        if !merged && !ctx.force {
            eprintln!(
                "{}",
                warning_message(cformat!(
                    "<bold>{}</> is not merged into <bold>{}</>; keeping the branch",
                    ctx.branch,
                    ctx.trunk
                ))
            );
            validator.decide(DELETE_BRANCH, Decision::No);
            return Ok(());
        }
        validator.confirm(DELETE_BRANCH, &format!("Delete branch {}?", ctx.branch), false)?;
        Ok(())
    }

    fn execute(&self, ctx: &RemovalContext<'a>, record: &ConfirmationRecord) -> anyhow::Result<StepOutcome> {
        if !record.approved(DELETE_BRANCH) {
            return Ok(StepOutcome::Skipped);
        }
        let force = ctx.force || self.merged_by_plan;
        ctx.manager.vcs().delete_branch(ctx.branch, force)?;
        Ok(StepOutcome::Done)
    }
}

/// Print what a two-phase run did.
pub(crate) fn report_execution(
    report: &ExecutionReport,
    ctx: &RemovalContext<'_>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    for step in &report.completed {
        let message = match step.as_str() {
            REMOVE_WORKTREE => {
                let (path, slot) = match &ctx.worktree {
                    Some(wt) => (
                        format_path_for_display(&wt.path),
                        wt.slot_index
                            .map(|i| format!(", released slot {i}"))
                            .unwrap_or_default(),
                    ),
                    None => (String::new(), String::new()),
                };
                cformat!("Removed worktree <bold>{path}</>{slot}")
            }
            DELETE_BRANCH => cformat!("Deleted branch <bold>{}</>", ctx.branch),
            other => step_message(other, ctx),
        };
        eprintln!("{}", success_message(message));
    }
    for step in &report.skipped {
        log::debug!("Skipped {step}");
        if step == DELETE_BRANCH {
            eprintln!("{}", info_message(cformat!("Kept branch <bold>{}</>", ctx.branch)));
        }
    }
    Ok(())
}

fn step_message(step: &str, ctx: &RemovalContext<'_>) -> String {
    match step {
        super::land::FAST_FORWARD => cformat!(
            "Fast-forwarded <bold>{}</> to <bold>{}</>",
            ctx.trunk,
            ctx.branch
        ),
        other => format!("Completed {other}"),
    }
}

pub(crate) fn handle_wt_create(
    branch: &str,
    base: Option<&str>,
    no_slot: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let env = CommandEnv::load()?;
    let manager = env.manager()?;
    let options = CheckoutOptions {
        no_slot,
        base: base.map(str::to_string),
    };
    let worktree = manager.checkout(branch, &options)?;
    report_worktree(&worktree, format)
}

pub(crate) struct RemoveOptions {
    pub force: bool,
    pub keep_branch: bool,
    pub yes: bool,
}

pub(crate) fn handle_wt_remove(
    branch: &str,
    options: RemoveOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let env = CommandEnv::load()?;
    let manager = env.manager()?;
    let worktree = manager.require(branch)?;

    let ctx = RemovalContext {
        manager: &manager,
        branch,
        worktree: Some(worktree),
        trunk: env.trunk()?,
        force: options.force,
    };
    let delete = DeleteBranchStep {
        keep: options.keep_branch,
        merged_by_plan: false,
    };
    let steps: [&dyn Step<RemovalContext<'_>>; 2] = [&RemoveWorktreeStep, &delete];
    let mut prompter = prompter(options.yes);
    let report = run_two_phase(&steps, &ctx, prompter.as_mut())?;
    report_execution(&report, &ctx, format)
}

pub(crate) fn handle_wt_list(format: OutputFormat) -> anyhow::Result<()> {
    let env = CommandEnv::load()?;
    let manager = env.manager()?;
    let listing = manager.list()?;
    if format == OutputFormat::Json {
        return print_json(&listing);
    }
    print_listing(&listing, &format_path_for_display(manager.layout().root()));
    Ok(())
}

fn print_listing(listing: &PoolListing, root: &str) {
    let used = listing.slots.iter().filter(|s| s.is_occupied()).count();
    eprintln!(
        "{}",
        info_message(cformat!(
            "Pool <bold>{root}</> ({used} of {} slots in use)",
            listing.capacity
        ))
    );

    let width = listing
        .slots
        .iter()
        .filter_map(|s| s.branch.as_deref())
        .chain(listing.direct.iter().map(|w| w.branch.as_str()))
        .map(visual_width)
        .max()
        .unwrap_or(0)
        .max("(free)".len());

    for slot in &listing.slots {
        let name = format!("slot-{:02}", slot.index);
        match &slot.branch {
            Some(branch) => {
                let pad = " ".repeat(width - visual_width(branch));
                let since = slot.assigned_at.as_deref().unwrap_or_default();
                println!("{}", cformat!("{name}  <bold>{branch}</>{pad}  <dim>{since}</>"));
            }
            None => println!("{}", cformat!("{name}  <dim>(free)</>")),
        }
    }
    for worktree in &listing.direct {
        let pad = " ".repeat(width - visual_width(&worktree.branch));
        println!(
            "{}",
            cformat!(
                "direct   <bold>{}</>{pad}  {}",
                worktree.branch,
                format_path_for_display(&worktree.path)
            )
        );
    }
}

#[derive(Serialize)]
struct DeferJson<'a> {
    branch: &'a str,
    name: &'a str,
    path: String,
}

pub(crate) fn handle_wt_defer(
    branch: &str,
    name: &str,
    command: &[String],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let env = CommandEnv::load()?;
    let manager = env.manager()?;
    let worktree = manager.require(branch)?;

    let body = command
        .iter()
        .map(|arg| shell_escape::escape(Cow::Borrowed(arg.as_str())).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let path = activation::write_named(&worktree, name, &body)?;

    match format {
        OutputFormat::Json => print_json(&DeferJson {
            branch,
            name,
            path: path.display().to_string(),
        }),
        OutputFormat::Text => {
            eprintln!(
                "{}",
                success_message(cformat!(
                    "Saved <bold>{name}</> for <bold>{branch}</> at <bold>{}</>",
                    format_path_for_display(&path)
                ))
            );
            println!("{}", path.display());
            Ok(())
        }
    }
}
