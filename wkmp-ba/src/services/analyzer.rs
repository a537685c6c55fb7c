//! Acoustic analyzer collaborator
//!
//! The batch core never looks inside the analysis. It hands an analyzer a
//! real audio file path, an output path and a fixed `AnalysisOptions`, and
//! expects a structured result file at the output path or an error.
//!
//! `EssentiaAnalyzer` is the production implementation. It runs the Essentia
//! music extractor as a child process:
//!
//! ```bash
//! essentia_streaming_extractor_music <input.wav> <output.json> [profile.yaml]
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Default Essentia command name
pub const ESSENTIA_COMMAND: &str = "essentia_streaming_extractor_music";

/// Output format tag understood by the analyzer
pub const JSON_FORMAT: &str = "json";

/// Analyzer errors
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Analyzer binary not found in PATH
    #[error("Analyzer binary not found: {0}")]
    BinaryNotFound(String),

    /// Failed to spawn or wait for the analyzer
    #[error("Failed to execute analyzer: {0}")]
    ExecutionError(String),

    /// Analyzer exited unsuccessfully
    #[error("Analyzer failed (exit code {code:?}): {stderr}")]
    AnalysisFailed { code: Option<i32>, stderr: String },

    /// Analyzer output missing or unreadable
    #[error("Invalid analyzer output: {0}")]
    OutputError(String),

    /// Requested output format is not supported
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Audio input not found at path
    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    /// Analysis exceeded the per-item time limit
    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error (file read/write)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Fixed options passed to every analyzer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Low-level spectral and loudness descriptors
    pub lowlevel: bool,
    /// Rhythm descriptors (BPM, onset rate, danceability)
    pub rhythm: bool,
    /// Tonal descriptors (key, scale, chords)
    pub tonal: bool,
    /// Output format tag
    pub format: String,
    /// Optional extractor profile
    pub profile: Option<PathBuf>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            lowlevel: true,
            rhythm: true,
            tonal: true,
            format: JSON_FORMAT.to_string(),
            profile: None,
        }
    }
}

impl AnalysisOptions {
    /// File extension of result files
    pub fn result_extension(&self) -> &str {
        &self.format
    }

    /// Feature groups that were switched off
    pub fn disabled_groups(&self) -> Vec<&'static str> {
        [
            ("lowlevel", self.lowlevel),
            ("rhythm", self.rhythm),
            ("tonal", self.tonal),
        ]
        .into_iter()
        .filter(|(_, enabled)| !enabled)
        .map(|(group, _)| group)
        .collect()
    }
}

/// Acoustic analyzer
///
/// Implementations must be safe to call concurrently for distinct items.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Analyze `input` and write the result to `output`
    async fn analyze(
        &self,
        input: &Path,
        output: &Path,
        options: &AnalysisOptions,
    ) -> Result<(), AnalyzerError>;
}

/// Essentia music extractor run as a child process
#[derive(Debug, Clone)]
pub struct EssentiaAnalyzer {
    command: String,
}

impl EssentiaAnalyzer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Verify the extractor can be spawned
    ///
    /// The extractor prints usage and exits non-zero without arguments, so
    /// only a spawn failure counts as unavailable.
    pub async fn check_available(&self) -> Result<(), AnalyzerError> {
        let result = Command::new(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AnalyzerError::BinaryNotFound(self.command.clone()))
            }
            Err(e) => Err(AnalyzerError::ExecutionError(e.to_string())),
        }
    }
}

#[async_trait]
impl Analyzer for EssentiaAnalyzer {
    fn name(&self) -> &str {
        "essentia"
    }

    async fn analyze(
        &self,
        input: &Path,
        output: &Path,
        options: &AnalysisOptions,
    ) -> Result<(), AnalyzerError> {
        if options.format != JSON_FORMAT {
            return Err(AnalyzerError::UnsupportedFormat(options.format.clone()));
        }

        if !input.exists() {
            return Err(AnalyzerError::FileNotFound(input.display().to_string()));
        }

        debug!(
            audio_file = %input.display(),
            output_file = %output.display(),
            "Running Essentia analysis"
        );

        let mut command = Command::new(&self.command);
        command.arg(input).arg(output);
        if let Some(profile) = &options.profile {
            command.arg(profile);
        }

        // Timeouts drop this future; the child must not outlive it
        let result = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AnalyzerError::ExecutionError(e.to_string()))?;

        if !result.status.success() {
            return Err(AnalyzerError::AnalysisFailed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if !output.exists() {
            return Err(AnalyzerError::OutputError(
                "analyzer exited successfully but wrote no output".to_string(),
            ));
        }

        let disabled = options.disabled_groups();
        if !disabled.is_empty() {
            strip_feature_groups(output, &disabled).await?;
        }

        Ok(())
    }
}

/// Remove top-level feature groups from a JSON result in place
pub async fn strip_feature_groups(path: &Path, groups: &[&str]) -> Result<(), AnalyzerError> {
    let content = tokio::fs::read_to_string(path).await?;

    let mut document: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| AnalyzerError::OutputError(format!("Failed to parse result JSON: {}", e)))?;

    let object = document
        .as_object_mut()
        .ok_or_else(|| AnalyzerError::OutputError("result JSON is not an object".to_string()))?;

    for group in groups {
        object.remove(*group);
    }

    let rendered = serde_json::to_vec_pretty(&document)
        .map_err(|e| AnalyzerError::OutputError(e.to_string()))?;
    tokio::fs::write(path, rendered).await?;

    Ok(())
}
