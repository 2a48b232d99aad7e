use color_print::cformat;
use erk::lifecycle::PoolIssue;
use erk::styling::{eprintln, format_with_gutter, hint_message, success_message, warning_message};
use serde::Serialize;

use super::context::CommandEnv;
use super::print_json;
use crate::cli::OutputFormat;

#[derive(Serialize)]
struct CheckJson<'a> {
    consistent: bool,
    issues: &'a [PoolIssue],
}

/// Report drift between the slot registry and the worktrees on disk.
/// Nothing is repaired.
pub(crate) fn handle_slot_check(format: OutputFormat) -> anyhow::Result<()> {
    let env = CommandEnv::load()?;
    let manager = env.manager()?;
    let issues = manager.check()?;

    if format == OutputFormat::Json {
        return print_json(&CheckJson {
            consistent: issues.is_empty(),
            issues: &issues,
        });
    }

    if issues.is_empty() {
        let pool = manager.pool()?;
        let used = pool.slots().iter().filter(|s| s.is_occupied()).count();
        eprintln!(
            "{}",
            success_message(cformat!(
                "Pool is consistent ({used} of {} slots in use)",
                pool.capacity()
            ))
        );
        return Ok(());
    }

    let noun = if issues.len() == 1 { "problem" } else { "problems" };
    let details = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    eprintln!(
        "{}",
        warning_message(cformat!("Found <bold>{}</> {noun} in the slot pool", issues.len()))
    );
    eprintln!("{}", format_with_gutter(&details, None));
    eprintln!(
        "{}",
        hint_message(cformat!(
            "Clean up a stale slot with <bright-black>erk wt remove BRANCH</>"
        ))
    );
    Ok(())
}
