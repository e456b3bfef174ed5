/// `kasher task cache` command implementation
///
/// Lists and removes cached task output. Entries whose task was deleted are
/// shown as orphaned.
use anyhow::{Context, Result};

use crate::cli::CacheCommands;
use crate::cli_utils::kasher_prefix;
use crate::context::RunContext;

pub fn run(ctx: &RunContext, command: CacheCommands) -> Result<()> {
    match command {
        CacheCommands::List => list(ctx),
        CacheCommands::Clean { name, all } => clean(ctx, name.as_deref(), all),
    }
}

fn list(ctx: &RunContext) -> Result<()> {
    let entries = ctx.cache().list().context("Failed to list cache entries")?;

    if entries.is_empty() {
        println!("No cached output.");
        return Ok(());
    }

    let tasks = ctx.registry().load().context("Failed to load tasks")?;

    println!("Cached output ({} entries):", entries.len());
    for name in entries {
        if tasks.contains_key(&name) {
            println!("  {}", name);
        } else {
            println!("  {} (orphaned)", name);
        }
    }
    Ok(())
}

fn clean(ctx: &RunContext, name: Option<&str>, all: bool) -> Result<()> {
    let cache = ctx.cache();

    if all {
        let removed = cache.clean_all().context("Failed to clean cache")?;
        println!("{} Removed {} cached entries.", kasher_prefix(), removed);
        return Ok(());
    }

    let Some(name) = name else {
        anyhow::bail!("Specify --all to clean all cached output, or provide a task name");
    };

    if cache.remove(name)? {
        println!("{} Removed cached output for '{}'.", kasher_prefix(), name);
    } else {
        println!("{} No cached output for '{}'.", kasher_prefix(), name);
    }
    Ok(())
}
