//! The get-or-run engine: output cache, freshness policy, executor and the
//! runner that ties them together.

pub mod cache;
pub mod executor;
pub mod freshness;
pub mod runner;

pub use cache::{CacheError, CacheStore};
pub use executor::{CommandError, ExecutionResult, TaskExecutor};
pub use freshness::{freshness, is_valid, Freshness};
pub use runner::{RunError, RunOutcome, TaskRunner};
