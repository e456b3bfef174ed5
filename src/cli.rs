use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::task::executor::DEFAULT_SHELL;

/// Kasher - shell task runner with caching
///
/// Define named shell commands once, then run them by name. Output is cached
/// and replayed until the task's TTL expires.
#[derive(Parser, Debug)]
#[command(name = "kasher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Shell task runner with caching", long_about = None)]
pub struct Cli {
    /// Task to run (omit to list tasks)
    pub task: Option<String>,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Task config file
    #[arg(long, global = true, env = "KASHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding cached task output
    #[arg(long, global = true, env = "KASHER_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Shell used to run task commands (invoked as `<shell> -c <command>`)
    #[arg(long, global = true, env = "KASHER_SHELL", default_value = DEFAULT_SHELL)]
    pub shell: String,

    /// Force refresh of cached task output
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Show extra information (config and cache locations)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage kasher tasks
    #[command(subcommand)]
    Task(TaskCommands),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task
    Create(CreateArgs),

    /// Create a new task for a given shell command
    #[command(name = "create-for")]
    CreateFor(CreateForArgs),

    /// Update an existing task
    Update(UpdateArgs),

    /// Delete a task (its cached output is kept)
    Delete {
        /// Task name
        name: String,
    },

    /// List all tasks
    List,

    /// Delete all task settings
    #[command(name = "clear-all")]
    ClearAll {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect or clean cached task output
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Task name (spaces are replaced with dashes)
    pub name: String,

    /// Shell command to run
    #[arg(short = 'c', long)]
    pub command: String,

    #[command(flatten)]
    pub details: TaskDetailsArgs,
}

#[derive(Args, Debug)]
pub struct CreateForArgs {
    /// Task name (spaces are replaced with dashes)
    #[arg(short, long)]
    pub name: String,

    #[command(flatten)]
    pub details: TaskDetailsArgs,

    /// Shell command; quote it if it contains pipes or operators
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TaskDetailsArgs {
    /// Cache expiration (e.g. 10m, 1h, 2h30m, 45s, 1.5h, 500ms)
    #[arg(short, long, default_value = "24h")]
    pub ttl: String,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Task name
    pub name: String,

    /// New shell command
    #[arg(short = 'c', long)]
    pub command: Option<String>,

    /// New cache expiration
    #[arg(short, long)]
    pub ttl: Option<String>,

    /// New notes (empty string clears them)
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List tasks with cached output
    List,

    /// Remove cached output
    Clean {
        /// Task name (omit with --all)
        name: Option<String>,

        /// Remove every cached entry
        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
}
