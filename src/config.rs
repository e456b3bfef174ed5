//! Task registry: the persisted mapping from task name to [`TaskDefinition`].
//!
//! The registry lives in a single TOML file with one table per task:
//!
//! ```toml
//! [build-status]
//! command = "echo status:ok"
//! expiration = "1h"
//! notes = "CI summary"
//! lastFetched = "2025-06-01T10:00:00Z"
//! ```
//!
//! The TTL is written under `expiration`, the key older kasher configs use;
//! `ttl` is accepted when reading.
//!
//! Every mutating operation is a whole-file read-modify-write. There is no
//! locking; concurrent writers race and the last one wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::logging::{operations, services, status};

/// Names that collide with CLI words and can never be used for a task.
pub const RESERVED_TASK_NAMES: &[&str] = &["task", "quit", "q", "exit", "?", "help"];

/// All tasks, keyed (and therefore sorted) by name.
pub type Tasks = BTreeMap<String, TaskDefinition>;

/// Persisted description of a single task.
///
/// `ttl` and `last_fetched` are kept as raw strings so that a malformed value
/// survives a load/save cycle untouched; it simply makes the cache stale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    /// Shell expression executed verbatim through the configured shell
    pub command: String,

    /// How long captured output stays valid (e.g. "10m", "1h", "2h30m")
    #[serde(
        default,
        rename = "expiration",
        alias = "ttl",
        skip_serializing_if = "Option::is_none"
    )]
    pub ttl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// RFC 3339 timestamp of the most recent execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched: Option<String>,
}

impl TaskDefinition {
    pub fn new(command: impl Into<String>, ttl: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ttl: Some(ttl.into()),
            notes: None,
            last_fetched: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = (!notes.trim().is_empty()).then_some(notes);
        self
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read task config: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse task config: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize task config")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to save task config: {}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Task '{0}' already exists")]
    AlreadyExists(String),

    #[error("Task '{0}' not found")]
    NotFound(String),

    #[error("The name '{0}' is reserved and cannot be used. Please choose another name")]
    ReservedName(String),

    #[error("Task name cannot be empty")]
    EmptyName,

    #[error("Task name '{0}' cannot contain path separators or start with '.'")]
    InvalidName(String),
}

impl RegistryError {
    /// True for failures reading or parsing the backing file.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Parse { .. })
    }

    /// True for failures serializing or writing the backing file.
    pub fn is_save_failure(&self) -> bool {
        matches!(self, Self::Save { .. } | Self::Serialize(_))
    }
}

/// Case-insensitive membership check against [`RESERVED_TASK_NAMES`].
pub fn is_reserved_task_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    RESERVED_TASK_NAMES.contains(&lowered.as_str())
}

/// Trim the name and replace inner spaces with dashes.
pub fn normalize_task_name(name: &str) -> String {
    name.trim().replace(' ', "-")
}

/// Check a (normalized) name before it enters the registry.
///
/// The name doubles as the cache file stem, so anything that would escape the
/// cache directory is refused.
pub fn validate_task_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::EmptyName);
    }
    if is_reserved_task_name(name) {
        return Err(RegistryError::ReservedName(name.to_string()));
    }
    if !is_path_safe_task_name(name) {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// True when `name` can be used as a file stem inside the cache directory.
///
/// Checked again wherever a name reaches the filesystem, since the config
/// file can be edited by hand.
pub fn is_path_safe_task_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0'])
}

/// File-backed task registry
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    path: PathBuf,
}

impl TaskRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every task. A missing file is an empty registry.
    pub fn load(&self) -> Result<Tasks, RegistryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(
                    service = services::TASK_REGISTRY,
                    operation = operations::LOAD,
                    status = status::NOT_FOUND,
                    path = %self.path.display(),
                    "no task config yet"
                );
                return Ok(Tasks::new());
            }
            Err(source) => {
                return Err(RegistryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let tasks: Tasks = toml::from_str(&contents).map_err(|source| RegistryError::Parse {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            service = services::TASK_REGISTRY,
            operation = operations::LOAD,
            status = status::SUCCESS,
            entry_count = tasks.len(),
            "task config loaded"
        );

        Ok(tasks)
    }

    /// Overwrite the backing file with `tasks`.
    pub fn save(&self, tasks: &Tasks) -> Result<(), RegistryError> {
        let serialized = toml::to_string_pretty(tasks)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| RegistryError::Save {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        fs::write(&self.path, serialized).map_err(|source| RegistryError::Save {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            service = services::TASK_REGISTRY,
            operation = operations::SAVE,
            status = status::SUCCESS,
            entry_count = tasks.len(),
            "task config saved"
        );

        Ok(())
    }

    /// Look up a single task.
    pub fn get(&self, name: &str) -> Result<TaskDefinition, RegistryError> {
        self.load()?
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Insert a new task. Fails if the name is taken or not allowed.
    pub fn add(&self, name: &str, task: TaskDefinition) -> Result<(), RegistryError> {
        validate_task_name(name)?;
        let mut tasks = self.load()?;
        if tasks.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        tasks.insert(name.to_string(), task);
        self.save(&tasks)
    }

    /// Replace an existing task.
    pub fn update(&self, name: &str, task: TaskDefinition) -> Result<(), RegistryError> {
        let mut tasks = self.load()?;
        match tasks.get_mut(name) {
            Some(existing) => *existing = task,
            None => return Err(RegistryError::NotFound(name.to_string())),
        }
        self.save(&tasks)
    }

    /// Remove a task. Its cached output is left in place.
    pub fn delete(&self, name: &str) -> Result<TaskDefinition, RegistryError> {
        let mut tasks = self.load()?;
        let removed = tasks
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.save(&tasks)?;
        Ok(removed)
    }

    /// Delete the backing file. A missing file is fine.
    pub fn clear(&self) -> Result<(), RegistryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RegistryError::Save {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
