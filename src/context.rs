//! Per-invocation settings, resolved once from CLI flags and environment and
//! handed to every command handler.

use std::path::PathBuf;

use crate::cli::GlobalArgs;
use crate::config::TaskRegistry;
use crate::task::{CacheStore, TaskExecutor};
use crate::xdg;

#[derive(Debug, Clone)]
pub struct RunContext {
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
    pub shell: String,
    pub force_refresh: bool,
    pub verbose: bool,
}

impl RunContext {
    /// Resolve paths: explicit flag/env first, XDG locations otherwise.
    pub fn from_args(args: &GlobalArgs) -> Self {
        Self {
            config_path: args.config.clone().unwrap_or_else(xdg::config_file),
            cache_dir: args.cache_dir.clone().unwrap_or_else(xdg::cache_dir),
            shell: args.shell.clone(),
            force_refresh: args.force,
            verbose: args.verbose,
        }
    }

    pub fn registry(&self) -> TaskRegistry {
        TaskRegistry::new(&self.config_path)
    }

    pub fn cache(&self) -> CacheStore {
        CacheStore::new(&self.cache_dir)
    }

    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor::new(&self.shell)
    }

    /// Print config and cache locations when `--verbose` is set.
    pub fn print_verbose_info(&self) {
        if !self.verbose {
            return;
        }
        println!("Kasher config file location:");
        println!("{}", self.config_path.display());
        println!("Kasher cache directory:");
        println!("{}", self.cache_dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_win() {
        let args = GlobalArgs {
            config: Some(PathBuf::from("/tmp/k/config.toml")),
            cache_dir: Some(PathBuf::from("/tmp/k/cache")),
            shell: "bash".to_string(),
            force: true,
            verbose: false,
        };

        let ctx = RunContext::from_args(&args);
        assert_eq!(ctx.config_path, PathBuf::from("/tmp/k/config.toml"));
        assert_eq!(ctx.cache_dir, PathBuf::from("/tmp/k/cache"));
        assert_eq!(ctx.executor().shell(), "bash");
        assert_eq!(ctx.registry().path(), ctx.config_path.as_path());
        assert_eq!(ctx.cache().dir(), ctx.cache_dir.as_path());
        assert!(ctx.force_refresh);
    }
}
