//! XDG Base Directory support for Kasher
//!
//! Follows the XDG Base Directory Specification:
//! - https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html
//!
//! Directory structure:
//! - `$XDG_CONFIG_HOME/kasher/` (default: platform config dir) - Task registry (`config.toml`)
//! - `$XDG_CACHE_HOME/kasher/` (default: platform cache dir) - Captured task output

use std::path::PathBuf;

/// File name of the task registry inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the Kasher config directory
///
/// Respects XDG_CONFIG_HOME environment variable.
/// Falls back to the platform config directory (`~/.config` on Linux,
/// `~/Library/Application Support` on macOS).
pub fn config_dir() -> PathBuf {
    if let Some(xdg_config) = non_empty_env("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("kasher")
    } else if let Some(config) = dirs::config_dir() {
        config.join("kasher")
    } else if let Some(home) = dirs::home_dir() {
        // XDG default: $HOME/.config
        home.join(".config").join("kasher")
    } else {
        PathBuf::from(".kasher")
    }
}

/// Default location of the task registry file
pub fn config_file() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the Kasher cache directory (one `<task>.cache` file per task)
///
/// Respects XDG_CACHE_HOME environment variable.
/// Falls back to `$HOME/.cache/kasher` on Unix, or appropriate path on other platforms.
pub fn cache_dir() -> PathBuf {
    if let Some(xdg_cache) = non_empty_env("XDG_CACHE_HOME") {
        PathBuf::from(xdg_cache).join("kasher")
    } else if let Some(cache) = dirs::cache_dir() {
        cache.join("kasher")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".cache").join("kasher")
    } else {
        PathBuf::from(".kasher-cache")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
