//! Subprocess execution with tracing
//!
//! Every external command erk spawns (today that is only `git`) goes through
//! [`run`], so `-vv` / `RUST_LOG=debug` shows a complete, timed command log.

use std::process::{Command, Output};
use std::time::Instant;

/// Execute a command with timing and debug logging.
///
/// This is the **only** way to run external commands in erk.
///
/// ```text
/// $ git worktree list --porcelain [slot-01]   # with context
/// $ git --version                             # without context
/// [erk-trace] context=slot-01 cmd="..." dur=12.3ms ok=true
/// ```
///
/// The `context` parameter is typically the directory name the command runs in.
pub fn run(cmd: &mut Command, context: Option<&str>) -> std::io::Result<Output> {
    let cmd_str = command_string(cmd);

    match context {
        Some(ctx) => log::debug!("$ {} [{}]", cmd_str, ctx),
        None => log::debug!("$ {}", cmd_str),
    }

    let t0 = Instant::now();
    let result = cmd.output();
    let duration_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let context_field = context.map(|ctx| format!("context={ctx} ")).unwrap_or_default();
    match &result {
        Ok(output) => log::debug!(
            "[erk-trace] {}cmd=\"{}\" dur={:.1}ms ok={}",
            context_field,
            cmd_str,
            duration_ms,
            output.status.success()
        ),
        Err(e) => log::debug!(
            "[erk-trace] {}cmd=\"{}\" dur={:.1}ms err=\"{}\"",
            context_field,
            cmd_str,
            duration_ms,
            e
        ),
    }

    result
}

fn command_string(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy()).collect();
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
