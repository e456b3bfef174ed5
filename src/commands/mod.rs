pub mod cache;
pub mod run;
pub mod task;

use crate::config::RegistryError;
use crate::task::runner::{RunError, EXIT_CODE_CONFIG_ERROR};

/// Map a command failure to the process exit status.
///
/// A failed task command exits with the task's own status; a missing task or
/// an unreadable config get fixed codes so callers can tell them apart.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(run_error) = err.downcast_ref::<RunError>() {
        return run_error.exit_code();
    }

    let config_failure = err.chain().any(|cause| {
        cause
            .downcast_ref::<RegistryError>()
            .is_some_and(|e| e.is_load_failure() || e.is_save_failure())
    });
    if config_failure {
        return EXIT_CODE_CONFIG_ERROR;
    }

    1
}
