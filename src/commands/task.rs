/// `kasher task` command implementation
///
/// Creates, updates, deletes and lists task definitions.
use anyhow::{Context, Result};
use chrono::Utc;
use std::io::{BufRead, Write};

use crate::cli::{CreateArgs, CreateForArgs, TaskCommands, TaskDetailsArgs, UpdateArgs};
use crate::cli_utils::kasher_prefix;
use crate::config::{normalize_task_name, TaskDefinition};
use crate::context::RunContext;
use crate::duration::parse_ttl;
use crate::task::freshness;

pub fn run(ctx: &RunContext, command: TaskCommands) -> Result<()> {
    ctx.print_verbose_info();

    match command {
        TaskCommands::Create(args) => create(ctx, args),
        TaskCommands::CreateFor(args) => create_for(ctx, args),
        TaskCommands::Update(args) => update(ctx, args),
        TaskCommands::Delete { name } => delete(ctx, &name),
        TaskCommands::List => list(ctx),
        TaskCommands::ClearAll { yes } => clear_all(ctx, yes),
        TaskCommands::Cache(command) => super::cache::run(ctx, command),
    }
}

fn create(ctx: &RunContext, args: CreateArgs) -> Result<()> {
    let name = task_name(&args.name);
    let task = build_task(&args.command, args.details)?;

    ctx.registry()
        .add(&name, task)
        .with_context(|| format!("Failed to create task '{}'", name))?;

    println!("Task '{}' created.", name);
    Ok(())
}

fn create_for(ctx: &RunContext, args: CreateForArgs) -> Result<()> {
    if args.command.len() > 1 {
        eprintln!(
            "{} Warning: It looks like you passed multiple arguments. If your command contains \
             spaces, pipes, or shell operators (like &&), you should quote the command, e.g.:\n  \
             kasher task create-for --name demo \"echo starting && sleep 5 && echo ending\"",
            kasher_prefix()
        );
    }

    let name = task_name(&args.name);
    let shell_command = args.command.join(" ");
    let task = build_task(&shell_command, args.details)?;

    ctx.registry()
        .add(&name, task)
        .with_context(|| format!("Failed to create task '{}'", name))?;

    println!("Task '{}' created for command: {}", name, shell_command);
    Ok(())
}

fn update(ctx: &RunContext, args: UpdateArgs) -> Result<()> {
    let registry = ctx.registry();
    let mut task = registry.get(&args.name)?;

    if let Some(command) = args.command {
        task.command = non_empty_command(&command)?;
    }
    if let Some(ttl) = args.ttl {
        task.ttl = Some(validated_ttl(&ttl)?);
    }
    if let Some(notes) = args.notes {
        task = task.with_notes(notes);
    }
    // Definition changed: the next run must execute again
    task.last_fetched = None;

    registry
        .update(&args.name, task)
        .with_context(|| format!("Failed to update task '{}'", args.name))?;

    println!("Task '{}' updated.", args.name);
    Ok(())
}

fn delete(ctx: &RunContext, name: &str) -> Result<()> {
    ctx.registry().delete(name)?;
    println!("Task '{}' deleted.", name);

    if ctx.verbose {
        let cache_entry = ctx.cache().entry_path(name).ok();
        if let Some(cache_entry) = cache_entry.filter(|path| path.exists()) {
            println!("Cached output kept at {}", cache_entry.display());
        }
    }
    Ok(())
}

/// Print every task, sorted by name
pub fn list(ctx: &RunContext) -> Result<()> {
    let tasks = ctx.registry().load().context("Failed to load tasks")?;

    if tasks.is_empty() {
        println!("No tasks found. Use 'kasher task create' to add one.");
        return Ok(());
    }

    let now = Utc::now();
    println!("Tasks:");
    for (name, task) in &tasks {
        println!(
            "- {}: {} (ttl: {}, last run: {}, {})",
            name,
            task.command,
            task.ttl.as_deref().unwrap_or("none"),
            task.last_fetched.as_deref().unwrap_or("never"),
            freshness(task, now, false).as_str()
        );
        if let Some(notes) = &task.notes {
            println!("    Notes: {}", notes);
        }
    }
    Ok(())
}

fn clear_all(ctx: &RunContext, yes: bool) -> Result<()> {
    if !yes {
        print!("Are you sure you want to delete all tasks and clear the config? (y/N): ");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;

        if !matches!(answer.trim(), "y" | "Y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    ctx.registry().clear().context("Failed to clear config")?;
    println!("Config cleared.");
    Ok(())
}

fn task_name(raw: &str) -> String {
    let name = normalize_task_name(raw);
    if name != raw.trim() {
        eprintln!(
            "{} Note: Spaces in task name will be replaced with dashes: '{}'",
            kasher_prefix(),
            name
        );
    }
    name
}

fn build_task(command: &str, details: TaskDetailsArgs) -> Result<TaskDefinition> {
    let command = non_empty_command(command)?;
    let ttl = validated_ttl(&details.ttl)?;
    Ok(TaskDefinition::new(command, ttl).with_notes(details.notes.unwrap_or_default()))
}

fn non_empty_command(command: &str) -> Result<String> {
    if command.trim().is_empty() {
        anyhow::bail!("Shell command cannot be empty");
    }
    Ok(command.to_string())
}

fn validated_ttl(ttl: &str) -> Result<String> {
    parse_ttl(ttl).with_context(|| {
        format!(
            "Invalid duration '{}'. Examples: 10m, 1h, 2h30m, 45s, 1.5h, 500ms",
            ttl
        )
    })?;
    Ok(ttl.trim().to_string())
}
