use erk::error::ErkError;
use erk::lifecycle::CheckoutOptions;
use erk::resolve::find_branch_for_issue;

use super::context::CommandEnv;
use super::report_worktree;
use super::resolve::resolve_here;
use crate::cli::OutputFormat;

/// Resolve the issue, find its `P<n>-` branch and enter its worktree.
pub(crate) fn handle_checkout(
    target: Option<&str>,
    no_slot: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let resolved = resolve_here(target, false)?;
    let env = CommandEnv::load()?;

    let branches = env.repo.list_local_branches()?;
    let branch = find_branch_for_issue(resolved.issue, &branches)
        .ok_or(ErkError::NoBranchForIssue {
            issue: resolved.issue,
        })?
        .to_string();
    log::info!(
        "Issue {} resolved via {} to branch {branch}",
        resolved.issue,
        resolved.source
    );

    let manager = env.manager()?;
    let options = CheckoutOptions {
        no_slot,
        base: None,
    };
    let worktree = manager.checkout(&branch, &options)?;
    report_worktree(&worktree, format)
}
