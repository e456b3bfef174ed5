use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use kasher::cli::{Cli, Commands};
use kasher::cli_utils::kasher_prefix;
use kasher::commands;
use kasher::context::RunContext;
use kasher::logging;
use kasher::task::RunError;

fn main() -> ExitCode {
    // Initialize structured logging
    logging::init();

    // Parse CLI arguments
    let cli = Cli::parse();
    let ctx = RunContext::from_args(&cli.global);

    match dispatch(&ctx, cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} error: {:#}", kasher_prefix(), err);
            if matches!(err.downcast_ref::<RunError>(), Some(RunError::TaskNotFound(_))) {
                eprintln!("Run 'kasher task list' to see available tasks.");
            }
            let code = commands::exit_code(&err);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn dispatch(ctx: &RunContext, cli: Cli) -> Result<()> {
    match (cli.command, cli.task) {
        (Some(Commands::Task(command)), _) => commands::task::run(ctx, command),
        (None, Some(name)) => commands::run::run(ctx, &name),
        (None, None) => {
            ctx.print_verbose_info();
            commands::task::list(ctx)
        }
    }
}
