//! Counting mock analyzer
//!
//! Decodes its input with hound and writes a small JSON document with the
//! decoded sample count. Inputs that are not valid WAV fail the way a real
//! extractor would on malformed audio.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use wkmp_ba::services::{AnalysisOptions, Analyzer, AnalyzerError};

/// One recorded analyzer invocation
#[derive(Debug, Clone)]
pub struct AnalyzerCall {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Default)]
pub struct MockAnalyzer {
    calls: Mutex<Vec<AnalyzerCall>>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AnalyzerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(
        &self,
        input: &Path,
        output: &Path,
        options: &AnalysisOptions,
    ) -> Result<(), AnalyzerError> {
        self.calls.lock().unwrap().push(AnalyzerCall {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        });

        let document = {
            let reader = hound::WavReader::open(input).map_err(|e| AnalyzerError::AnalysisFailed {
                code: Some(1),
                stderr: e.to_string(),
            })?;

            serde_json::json!({
                "metadata": {
                    "audio_properties": {
                        "sample_rate": reader.spec().sample_rate,
                        "length": reader.len(),
                    }
                },
                "lowlevel": options.lowlevel,
                "rhythm": options.rhythm,
                "tonal": options.tonal,
            })
        };

        tokio::fs::write(output, document.to_string()).await?;
        Ok(())
    }
}
