//! Configuration file discovery and setting resolution
//!
//! Settings follow the WKMP priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Logging configuration shared by all module TOML files
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the TOML config file for a module
///
/// Checks the user config directory (`~/.config/wkmp/<module>.toml` on Linux)
/// first, then `/etc/wkmp/<module>.toml` on Linux. Returns `None` when no file
/// exists; a missing config file is not an error.
pub fn find_config_file(module_name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", module_name);

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("wkmp").join(&file_name)) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/wkmp").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve one setting from its four sources
///
/// An environment variable that is set but does not parse is a configuration
/// error rather than a silent fallback to TOML.
pub fn resolve_setting<T>(
    cli_value: Option<T>,
    env_var_name: &str,
    toml_value: Option<T>,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = cli_value {
        return Ok(value);
    }

    if let Ok(raw) = std::env::var(env_var_name) {
        return raw.parse::<T>().map_err(|e| {
            Error::Config(format!("Invalid value '{}' for {}: {}", raw, env_var_name, e))
        });
    }

    if let Some(value) = toml_value {
        tracing::debug!(setting = env_var_name, "Using value from TOML config");
        return Ok(value);
    }

    Ok(default)
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
