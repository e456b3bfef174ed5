/// `kasher <task>` implementation
///
/// Prints cached output when fresh, otherwise runs the task live.
use anyhow::{Context, Result};
use std::error::Error as _;
use std::io::Write;

use crate::cli_utils::kasher_prefix;
use crate::context::RunContext;
use crate::task::runner::{PersistError, RunError, RunOutcome, TaskRunner};

pub fn run(ctx: &RunContext, name: &str) -> Result<()> {
    ctx.print_verbose_info();

    let registry = ctx.registry();
    let cache = ctx.cache();
    let executor = ctx.executor();

    let outcome = TaskRunner::new(&registry, &cache, &executor)
        .announce(true)
        .get_or_run(name, ctx.force_refresh);

    match outcome {
        Ok(RunOutcome::Cached { output }) => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&output)
                .and_then(|()| stdout.flush())
                .context("Failed to write cached output")?;
            Ok(())
        }
        Ok(RunOutcome::Live {
            duration,
            persist_errors,
            ..
        }) => {
            report_persist_errors(&persist_errors);
            if ctx.verbose {
                eprintln!(
                    "{} Completed in {:.2}s",
                    kasher_prefix(),
                    duration.as_secs_f64()
                );
            }
            Ok(())
        }
        Err(e) => {
            if let RunError::CommandFailed { persist_errors, .. } = &e {
                report_persist_errors(persist_errors);
            }
            Err(e.into())
        }
    }
}

fn report_persist_errors(errors: &[PersistError]) {
    for error in errors {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(&format!(": {}", cause));
            source = cause.source();
        }
        eprintln!("{} warning: {}", kasher_prefix(), message);
    }
}
