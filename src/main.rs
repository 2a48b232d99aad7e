use std::process;

use ansi_str::AnsiStr;
use clap::Parser;
use erk::config::{ConfigError, set_config_path};
use erk::error::{ErkError, error_code};
use erk::git::{GitError, set_base_path};
use erk::styling::{eprintln, error_message, format_with_gutter, println, set_verbosity};

mod cli;
mod commands;

use cli::{Cli, Commands, OutputFormat, SlotCommand, WtCommand};
use commands::{
    LandOptions, RemoveOptions, handle_checkout, handle_land, handle_resolve, handle_slot_check,
    handle_wt_create, handle_wt_defer, handle_wt_list, handle_wt_remove,
};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    set_verbosity(cli.verbose);
    if let Some(dir) = cli.directory {
        set_base_path(dir);
    }
    if let Some(path) = cli.config {
        set_config_path(path);
    }
    let format = cli.format;

    let result = match cli.command {
        Commands::Resolve { target, strict } => handle_resolve(target.as_deref(), strict, format),
        Commands::Checkout { target, no_slot } => {
            handle_checkout(target.as_deref(), no_slot, format)
        }
        Commands::Wt(command) => match command {
            WtCommand::Create {
                branch,
                base,
                no_slot,
            } => handle_wt_create(&branch, base.as_deref(), no_slot, format),
            WtCommand::Remove {
                branch,
                force,
                keep_branch,
                yes,
            } => handle_wt_remove(
                &branch,
                RemoveOptions {
                    force,
                    keep_branch,
                    yes,
                },
                format,
            ),
            WtCommand::List => handle_wt_list(format),
            WtCommand::Defer {
                branch,
                name,
                command,
            } => handle_wt_defer(&branch, &name, &command, format),
        },
        Commands::Land {
            branch,
            target,
            keep_branch,
            yes,
        } => handle_land(
            LandOptions {
                branch,
                target,
                keep_branch,
                yes,
            },
            format,
        ),
        Commands::Slot(SlotCommand::Check) => handle_slot_check(format),
    };

    if let Err(err) = result {
        report_error(&err, format);
        process::exit(1);
    }
}

fn is_typed(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ErkError>().is_some()
        || err.downcast_ref::<GitError>().is_some()
        || err.downcast_ref::<ConfigError>().is_some()
}

fn report_error(err: &anyhow::Error, format: OutputFormat) {
    if format == OutputFormat::Json {
        let body = serde_json::json!({
            "error": {
                "code": error_code(err),
                "message": format!("{err:#}").ansi_strip(),
            }
        });
        println!("{body:#}");
        return;
    }

    // Typed errors render their own header and hints
    if err.chain().count() == 1 && is_typed(err) {
        eprintln!("{err}");
        return;
    }

    eprintln!("{}", error_message(err.to_string()));
    let causes = err
        .chain()
        .skip(1)
        .map(|cause| cause.to_string().ansi_strip().into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    if !causes.is_empty() {
        eprintln!("{}", format_with_gutter(&causes, None));
    }
}
