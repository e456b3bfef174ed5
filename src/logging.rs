//! Structured logging utilities for Kasher
//!
//! Task output owns stdout and stderr, so diagnostics are quiet by default
//! (`warn`) and always written to stderr. All logs use structured fields.
//!
//! # Log Format Conventions
//!
//! - `service`: The component emitting the event ("task.cache", "task.registry", ...)
//! - `operation`: The operation being performed ("read", "write", "load", ...)
//! - `status`: The result status ("success", "miss", "error", ...)
//! - `task`: Task name
//! - `size_bytes`: Size in bytes
//!
//! The names are collected in [`fields`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use tracing::info;
//!
//! info!(
//!     service = services::TASK_CACHE,
//!     operation = operations::READ,
//!     status = status::HIT,
//!     task = %name,
//!     size_bytes = payload.len(),
//!     "cache hit"
//! );
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Formatter that shows "kasher" instead of the full module path
struct KasherFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for KasherFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f%:z")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            };
            write!(writer, "{}{:5}(kasher)\x1b[0m: ", level_style, meta.level())?;
        } else {
            write!(writer, "{:5}(kasher): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored
    Pretty,
    /// Same layout without ANSI colors (CI, pipes)
    Compact,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse from environment variable (KASHER_LOG_FORMAT)
    pub fn from_env() -> Self {
        Self::parse(
            &std::env::var("KASHER_LOG_FORMAT").unwrap_or_default(),
            std::env::var("CI").is_ok(),
        )
    }

    fn parse(value: &str, in_ci: bool) -> Self {
        match value.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ if in_ci => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (default "warn")
/// - `KASHER_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match LogFormat::from_env() {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(KasherFormatter { with_ansi: true })
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(KasherFormatter { with_ansi: false })
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(false)
                        .with_writer(io::stderr)
                        .json(),
                )
                .init();
        }
    }
}

/// Standard field names for structured logging
pub mod fields {
    /// Service name (e.g., "task.cache", "task.runner")
    pub const SERVICE: &str = "service";
    /// Operation name (e.g., "read", "write", "persist")
    pub const OPERATION: &str = "operation";
    /// Status (e.g., "success", "miss", "error")
    pub const STATUS: &str = "status";
    /// Task name
    pub const TASK: &str = "task";
    /// File or directory involved
    pub const PATH: &str = "path";
    /// Size in bytes
    pub const SIZE_BYTES: &str = "size_bytes";
    /// Number of tasks in the registry
    pub const ENTRY_COUNT: &str = "entry_count";
    /// Why cached output was not used (a freshness state)
    pub const REASON: &str = "reason";
    /// Wall-clock time of a command
    pub const DURATION_MS: &str = "duration_ms";
}

/// Service names for consistent logging
pub mod services {
    pub const TASK_REGISTRY: &str = "task.registry";
    pub const TASK_CACHE: &str = "task.cache";
    pub const TASK_EXECUTOR: &str = "task.executor";
    pub const TASK_RUNNER: &str = "task.runner";
}

/// Operation names for consistent logging
pub mod operations {
    pub const LOAD: &str = "load";
    pub const SAVE: &str = "save";
    pub const READ: &str = "read";
    pub const WRITE: &str = "write";
    pub const REMOVE: &str = "remove";
    pub const EXECUTE: &str = "execute";
    pub const PERSIST: &str = "persist";
}

/// Status values for consistent logging
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const HIT: &str = "hit";
    pub const MISS: &str = "miss";
    pub const STALE: &str = "stale";
    pub const ERROR: &str = "error";
    pub const NOT_FOUND: &str = "not_found";
}
