// Library interface for Kasher
// This allows integration tests and external code to use Kasher's modules

pub mod cli;
pub mod cli_utils;
pub mod commands;
pub mod config;
pub mod context;
pub mod duration;
pub mod logging;
pub mod task;
pub mod xdg;

// Re-export commonly used types
pub use config::{TaskDefinition, TaskRegistry};
pub use context::RunContext;
pub use task::{CacheStore, RunError, RunOutcome, TaskExecutor, TaskRunner};
