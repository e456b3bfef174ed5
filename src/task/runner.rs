/// Get-or-run orchestration
///
/// Serves a task's cached output while it is fresh, otherwise executes the
/// command, caches what it printed and stamps `lastFetched`.
///
/// The cache file is always written before the registry is saved, so a crash
/// in between leaves an old timestamp next to new output rather than a fresh
/// timestamp next to output that was never written.
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cli_utils::kasher_prefix;
use crate::config::{is_path_safe_task_name, RegistryError, TaskRegistry, Tasks};
use crate::logging::{operations, services, status};

use super::cache::{CacheError, CacheStore};
use super::executor::{CommandError, ExecutionResult, TaskExecutor};
use super::freshness::{format_timestamp, freshness};

/// Exit code when the requested task does not exist (EX_NOINPUT)
pub const EXIT_CODE_TASK_NOT_FOUND: i32 = 66;

/// Exit code when the task config cannot be read or written (EX_CONFIG)
pub const EXIT_CODE_CONFIG_ERROR: i32 = 78;

/// Whole-collection access to task definitions
pub trait TaskStore {
    fn load_tasks(&self) -> Result<Tasks, RegistryError>;
    fn save_tasks(&self, tasks: &Tasks) -> Result<(), RegistryError>;
}

/// Per-task output blobs
pub trait OutputCache {
    fn read_output(&self, name: &str) -> Result<Vec<u8>, CacheError>;
    fn write_output(&self, name: &str, payload: &[u8]) -> Result<(), CacheError>;
}

/// Something that can execute a shell command
pub trait CommandRunner {
    fn run(&self, command: &str) -> ExecutionResult;
}

impl TaskStore for TaskRegistry {
    fn load_tasks(&self) -> Result<Tasks, RegistryError> {
        self.load()
    }

    fn save_tasks(&self, tasks: &Tasks) -> Result<(), RegistryError> {
        self.save(tasks)
    }
}

impl OutputCache for CacheStore {
    fn read_output(&self, name: &str) -> Result<Vec<u8>, CacheError> {
        self.read(name)
    }

    fn write_output(&self, name: &str, payload: &[u8]) -> Result<(), CacheError> {
        self.write(name, payload)
    }
}

impl CommandRunner for TaskExecutor {
    fn run(&self, command: &str) -> ExecutionResult {
        self.execute(command)
    }
}

/// Failure to record a live run. Never fatal to the run itself.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to write cached output")]
    Cache(#[source] CacheError),

    #[error("Failed to record last run time")]
    Registry(#[source] RegistryError),
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Failed to load task config")]
    ConfigLoad(#[source] RegistryError),

    #[error("Task name '{0}' cannot be used as a cache file name; rename it in the config")]
    InvalidName(String),

    #[error("Task '{task}' failed")]
    CommandFailed {
        task: String,
        #[source]
        source: CommandError,
        output: Vec<u8>,
        persist_errors: Vec<PersistError>,
    },
}

impl RunError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TaskNotFound(_) => EXIT_CODE_TASK_NOT_FOUND,
            Self::ConfigLoad(_) | Self::InvalidName(_) => EXIT_CODE_CONFIG_ERROR,
            Self::CommandFailed { source, .. } => source.exit_code(),
        }
    }
}

/// Successful get-or-run
#[derive(Debug)]
pub enum RunOutcome {
    /// Served from cache; the command did not run
    Cached { output: Vec<u8> },
    /// The command ran and its output has already been streamed
    Live {
        output: Vec<u8>,
        duration: Duration,
        persist_errors: Vec<PersistError>,
    },
}

impl RunOutcome {
    pub fn output(&self) -> &[u8] {
        match self {
            Self::Cached { output } | Self::Live { output, .. } => output,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached { .. })
    }
}

/// Composes a task store, an output cache and a command runner.
pub struct TaskRunner<'a, S, C, R> {
    store: &'a S,
    cache: &'a C,
    runner: &'a R,
    announce: bool,
}

impl<'a, S, C, R> TaskRunner<'a, S, C, R>
where
    S: TaskStore,
    C: OutputCache,
    R: CommandRunner,
{
    pub fn new(store: &'a S, cache: &'a C, runner: &'a R) -> Self {
        Self {
            store,
            cache,
            runner,
            announce: false,
        }
    }

    /// Print `[kasher] Running: <command>` to stderr before executing.
    pub fn announce(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    /// Return cached output for `name` if fresh, otherwise run and cache it.
    pub fn get_or_run(&self, name: &str, force_refresh: bool) -> Result<RunOutcome, RunError> {
        let tasks = self.store.load_tasks().map_err(RunError::ConfigLoad)?;
        let task = tasks
            .get(name)
            .ok_or_else(|| RunError::TaskNotFound(name.to_string()))?;
        if !is_path_safe_task_name(name) {
            return Err(RunError::InvalidName(name.to_string()));
        }

        let state = freshness(task, Utc::now(), force_refresh);
        debug!(
            service = services::TASK_RUNNER,
            task = %name,
            freshness = state.as_str(),
            "evaluated cache freshness"
        );

        if state.is_fresh() {
            match self.cache.read_output(name) {
                Ok(output) => {
                    info!(
                        service = services::TASK_RUNNER,
                        operation = operations::READ,
                        status = status::HIT,
                        task = %name,
                        size_bytes = output.len(),
                        "serving cached output"
                    );
                    return Ok(RunOutcome::Cached { output });
                }
                Err(CacheError::Miss(_)) => {
                    info!(
                        service = services::TASK_RUNNER,
                        status = status::MISS,
                        task = %name,
                        "cache file missing despite fresh timestamp, re-running"
                    );
                }
                Err(e) => {
                    warn!(
                        service = services::TASK_RUNNER,
                        status = status::ERROR,
                        task = %name,
                        error = %e,
                        "cache unreadable, re-running"
                    );
                }
            }
        } else {
            info!(
                service = services::TASK_RUNNER,
                status = status::STALE,
                task = %name,
                reason = state.as_str(),
                "cache not usable"
            );
        }

        if self.announce {
            eprintln!("{} Running: {}", kasher_prefix(), task.command);
        }

        let result = self.runner.run(&task.command);
        let output = result.combined_output();
        let persist_errors = self.persist(name, &output);

        match result.error {
            Some(source) => Err(RunError::CommandFailed {
                task: name.to_string(),
                source,
                output,
                persist_errors,
            }),
            None => Ok(RunOutcome::Live {
                output,
                duration: result.duration,
                persist_errors,
            }),
        }
    }

    /// Write the cache, then stamp `lastFetched`. Failures are collected, not raised.
    fn persist(&self, name: &str, output: &[u8]) -> Vec<PersistError> {
        let mut errors = Vec::new();

        if let Err(e) = self.cache.write_output(name, output) {
            warn!(
                service = services::TASK_RUNNER,
                operation = operations::PERSIST,
                status = status::ERROR,
                task = %name,
                error = %e,
                "failed to cache task output"
            );
            errors.push(PersistError::Cache(e));
        }

        // Reload so edits made while the command ran are not clobbered
        let stamped = self.store.load_tasks().and_then(|mut tasks| {
            match tasks.get_mut(name) {
                Some(task) => task.last_fetched = Some(format_timestamp(Utc::now())),
                None => {
                    warn!(
                        service = services::TASK_RUNNER,
                        operation = operations::PERSIST,
                        status = status::NOT_FOUND,
                        task = %name,
                        "task removed while running, not recording last run"
                    );
                    return Ok(());
                }
            }
            self.store.save_tasks(&tasks)
        });

        if let Err(e) = stamped {
            warn!(
                service = services::TASK_RUNNER,
                operation = operations::PERSIST,
                status = status::ERROR,
                task = %name,
                error = %e,
                "failed to record last run time"
            );
            errors.push(PersistError::Registry(e));
        }

        errors
    }
}
