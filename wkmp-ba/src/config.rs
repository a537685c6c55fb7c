//! Configuration for wkmp-ba
//!
//! Resolution priority for every setting: command line → environment →
//! `wkmp-ba.toml` → built-in default. The result is one immutable
//! `BatchConfig` that the driver and its components receive explicitly.

use crate::error::{BatchError, BatchResult};
use crate::services::analyzer::{AnalysisOptions, ESSENTIA_COMMAND, JSON_FORMAT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wkmp_common::config::{expand_home, resolve_setting, LoggingConfig};

/// Module name used for the config file (`wkmp-ba.toml`)
pub const MODULE_NAME: &str = "wkmp-ba";

/// Default archive file extension
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "tar";

/// Default audio member extension
pub const DEFAULT_AUDIO_EXTENSION: &str = "wav";

/// `wkmp-ba.toml` contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Concurrent analyzer workers (default: CPU count)
    #[serde(default)]
    pub workers: Option<usize>,

    #[serde(default)]
    pub archive_extension: Option<String>,

    #[serde(default)]
    pub audio_extension: Option<String>,

    /// Directory for extracted members (default: system temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    #[serde(default)]
    pub analyzer: AnalyzerToml,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[analyzer]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzerToml {
    pub command: Option<String>,
    pub profile: Option<PathBuf>,
    pub timeout_seconds: Option<u64>,
    pub lowlevel: Option<bool>,
    pub rhythm: Option<bool>,
    pub tonal: Option<bool>,
    pub format: Option<String>,
}

/// Values taken from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input: PathBuf,
    pub output: PathBuf,
    pub recompute_existing: bool,
    pub workers: Option<usize>,
}

/// Fully resolved batch configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory scanned for archives
    pub input_root: PathBuf,
    /// Root of the result tree
    pub output_root: PathBuf,
    /// Reprocess members whose result already exists
    pub recompute_existing: bool,
    /// Concurrent analyzer workers
    pub workers: usize,
    pub archive_extension: String,
    pub audio_extension: String,
    /// Where extracted members are written (system temp dir when `None`)
    pub temp_dir: Option<PathBuf>,
    /// Analyzer executable
    pub analyzer_command: String,
    /// Options passed to every analyzer call
    pub analysis: AnalysisOptions,
    /// Per-item analyzer time limit
    pub item_timeout: Option<Duration>,
    pub log_level: String,
}

impl BatchConfig {
    /// Configuration with built-in defaults for the given roots
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            recompute_existing: false,
            workers: default_workers(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            audio_extension: DEFAULT_AUDIO_EXTENSION.to_string(),
            temp_dir: None,
            analyzer_command: ESSENTIA_COMMAND.to_string(),
            analysis: AnalysisOptions::default(),
            item_timeout: None,
            log_level: LoggingConfig::default().level,
        }
    }

    /// Merge command-line overrides with environment and TOML settings
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> BatchResult<Self> {
        let input_root = absolute(&expand_home(&overrides.input))?;
        let output_root = absolute(&expand_home(&overrides.output))?;

        let workers = resolve_setting(
            overrides.workers,
            "WKMP_BA_JOBS",
            toml.workers,
            default_workers(),
        )?;

        let analyzer_command = resolve_setting(
            None,
            "WKMP_BA_ANALYZER",
            toml.analyzer.command.clone(),
            ESSENTIA_COMMAND.to_string(),
        )?;

        let temp_dir = std::env::var_os("WKMP_BA_TEMP_DIR")
            .map(PathBuf::from)
            .or(toml.temp_dir)
            .map(|dir| expand_home(&dir));

        let timeout_seconds = resolve_setting(
            None,
            "WKMP_BA_TIMEOUT_SECS",
            toml.analyzer.timeout_seconds,
            0u64,
        )?;

        let defaults = AnalysisOptions::default();
        let analysis = AnalysisOptions {
            lowlevel: toml.analyzer.lowlevel.unwrap_or(defaults.lowlevel),
            rhythm: toml.analyzer.rhythm.unwrap_or(defaults.rhythm),
            tonal: toml.analyzer.tonal.unwrap_or(defaults.tonal),
            format: toml.analyzer.format.unwrap_or(defaults.format),
            profile: toml.analyzer.profile.map(|p| expand_home(&p)),
        };

        Ok(Self {
            input_root,
            output_root,
            recompute_existing: overrides.recompute_existing,
            workers,
            archive_extension: toml
                .archive_extension
                .unwrap_or_else(|| DEFAULT_ARCHIVE_EXTENSION.to_string()),
            audio_extension: toml
                .audio_extension
                .unwrap_or_else(|| DEFAULT_AUDIO_EXTENSION.to_string()),
            temp_dir,
            analyzer_command,
            analysis,
            item_timeout: (timeout_seconds > 0).then(|| Duration::from_secs(timeout_seconds)),
            log_level: toml.logging.level,
        })
    }

    /// Startup checks; any failure here is fatal
    pub fn validate(&self) -> BatchResult<()> {
        if !self.input_root.exists() {
            return Err(BatchError::Config(format!(
                "Input directory not found: {}",
                self.input_root.display()
            )));
        }

        if !self.input_root.is_dir() {
            return Err(BatchError::Config(format!(
                "Input is not a directory: {}",
                self.input_root.display()
            )));
        }

        if self.output_root.is_file() {
            return Err(BatchError::Config(format!(
                "Output path is a file: {}",
                self.output_root.display()
            )));
        }

        if self.workers == 0 {
            return Err(BatchError::Config("Worker count must be at least 1".to_string()));
        }

        if self.analysis.format != JSON_FORMAT {
            return Err(BatchError::Config(format!(
                "Unsupported output format '{}' (only '{}' is supported)",
                self.analysis.format, JSON_FORMAT
            )));
        }

        if self.archive_extension.trim_start_matches('.').is_empty()
            || self.audio_extension.trim_start_matches('.').is_empty()
        {
            return Err(BatchError::Config("File extensions must not be empty".to_string()));
        }

        if let Some(dir) = &self.temp_dir {
            if !dir.is_dir() {
                return Err(BatchError::Config(format!(
                    "Temporary directory not found: {}",
                    dir.display()
                )));
            }
        }

        if let Some(profile) = &self.analysis.profile {
            if !profile.is_file() {
                return Err(BatchError::Config(format!(
                    "Analyzer profile not found: {}",
                    profile.display()
                )));
            }
        }

        Ok(())
    }
}

/// One worker per available CPU
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

fn absolute(path: &Path) -> BatchResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir()
        .map_err(|e| BatchError::Config(format!("Cannot resolve working directory: {}", e)))?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn overrides(input: &Path, output: &Path) -> ConfigOverrides {
        ConfigOverrides {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            recompute_existing: false,
            workers: None,
        }
    }

    fn clear_env() {
        for var in ["WKMP_BA_JOBS", "WKMP_BA_ANALYZER", "WKMP_BA_TEMP_DIR", "WKMP_BA_TIMEOUT_SECS"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_resolve_defaults() {
        clear_env();
        let input = TempDir::new().unwrap();

        let config = BatchConfig::resolve(
            overrides(input.path(), &input.path().join("out")),
            TomlConfig::default(),
        )
        .unwrap();

        assert_eq!(config.workers, default_workers());
        assert_eq!(config.archive_extension, "tar");
        assert_eq!(config.audio_extension, "wav");
        assert_eq!(config.analyzer_command, ESSENTIA_COMMAND);
        assert_eq!(config.analysis, AnalysisOptions::default());
        assert_eq!(config.item_timeout, None);
        assert_eq!(config.temp_dir, None);
        assert_eq!(config.log_level, "info");
        assert!(!config.recompute_existing);
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn test_resolve_toml_values() {
        clear_env();
        let input = TempDir::new().unwrap();
        let toml: TomlConfig = toml::from_str(
            r#"
            workers = 3
            audio_extension = "flac"

            [analyzer]
            command = "/opt/essentia/bin/extractor"
            timeout_seconds = 600
            tonal = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let config =
            BatchConfig::resolve(overrides(input.path(), &input.path().join("out")), toml).unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.audio_extension, "flac");
        assert_eq!(config.analyzer_command, "/opt/essentia/bin/extractor");
        assert_eq!(config.item_timeout, Some(Duration::from_secs(600)));
        assert!(config.analysis.lowlevel);
        assert!(!config.analysis.tonal);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_cli_and_env_override_toml() {
        clear_env();
        let input = TempDir::new().unwrap();
        let toml = TomlConfig {
            workers: Some(3),
            analyzer: AnalyzerToml {
                command: Some("from-toml".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        std::env::set_var("WKMP_BA_ANALYZER", "from-env");
        let mut cli = overrides(input.path(), &input.path().join("out"));
        cli.workers = Some(7);
        cli.recompute_existing = true;

        let config = BatchConfig::resolve(cli, toml).unwrap();
        clear_env();

        assert_eq!(config.workers, 7);
        assert_eq!(config.analyzer_command, "from-env");
        assert!(config.recompute_existing);
    }

    #[test]
    #[serial]
    fn test_relative_paths_become_absolute() {
        clear_env();
        let config = BatchConfig::resolve(
            ConfigOverrides {
                input: PathBuf::from("datasets"),
                output: PathBuf::from("results"),
                ..Default::default()
            },
            TomlConfig::default(),
        )
        .unwrap();

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(config.input_root, cwd.join("datasets"));
        assert_eq!(config.output_root, cwd.join("results"));
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        let config = BatchConfig::new("/nonexistent/wkmp-ba/input", "/tmp/wkmp-ba-out");
        assert!(matches!(config.validate(), Err(BatchError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let input = TempDir::new().unwrap();

        let mut config = BatchConfig::new(input.path(), input.path().join("out"));
        config.workers = 0;
        assert!(matches!(config.validate(), Err(BatchError::Config(_))));

        let mut config = BatchConfig::new(input.path(), input.path().join("out"));
        config.analysis.format = "yaml".to_string();
        assert!(matches!(config.validate(), Err(BatchError::Config(_))));

        let mut config = BatchConfig::new(input.path(), input.path().join("out"));
        config.temp_dir = Some(input.path().join("missing-tmp"));
        assert!(matches!(config.validate(), Err(BatchError::Config(_))));

        let file = input.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let config = BatchConfig::new(&file, input.path().join("out"));
        assert!(matches!(config.validate(), Err(BatchError::Config(_))));
    }
}
