//! Dispatch pool
//!
//! Runs the analyzer over materialized items with a bounded number of items
//! in flight. Each item runs in its own task, so an analyzer error, timeout or
//! panic is confined to that item.
//!
//! Results are written to a staging path beside the destination and renamed
//! into place only on success. A destination therefore exists only when its
//! analysis completed, which is what skip-existing relies on.

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::models::MaterializedItem;
use crate::services::analyzer::{AnalysisOptions, Analyzer, AnalyzerError};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Suffix appended to a destination while its analysis is running
pub const STAGING_SUFFIX: &str = ".partial";

/// Staging path for `destination`
pub fn staging_path(destination: &Path) -> PathBuf {
    let mut staged = destination.as_os_str().to_owned();
    staged.push(STAGING_SUFFIX);
    PathBuf::from(staged)
}

/// Outcome counts of one pool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Bounded analyzer pool
#[derive(Clone)]
pub struct DispatchPool {
    analyzer: Arc<dyn Analyzer>,
    options: Arc<AnalysisOptions>,
    workers: usize,
    item_timeout: Option<Duration>,
}

impl DispatchPool {
    pub fn new(analyzer: Arc<dyn Analyzer>, options: AnalysisOptions, workers: usize) -> Self {
        Self {
            analyzer,
            options: Arc::new(options),
            workers: workers.max(1),
            item_timeout: None,
        }
    }

    pub fn from_config(analyzer: Arc<dyn Analyzer>, config: &BatchConfig) -> Self {
        Self::new(analyzer, config.analysis.clone(), config.workers).with_timeout(config.item_timeout)
    }

    /// Limit each analyzer call to `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Analyze every item, returning once all of them succeeded or failed
    ///
    /// Completion order is unspecified. Every item's temporary file is gone
    /// when this returns.
    pub async fn run(&self, items: Vec<MaterializedItem>) -> DispatchReport {
        let total = items.len();
        if total == 0 {
            return DispatchReport::default();
        }

        info!(
            items = total,
            workers = self.workers,
            analyzer = self.analyzer.name(),
            "Dispatching analysis"
        );

        let completed = Arc::new(AtomicUsize::new(0));

        let results: Vec<Result<(), BatchError>> = stream::iter(items)
            .map(|item| {
                let analyzer = Arc::clone(&self.analyzer);
                let options = Arc::clone(&self.options);
                let timeout = self.item_timeout;
                let completed = Arc::clone(&completed);
                let file = item.work_item().member_file_name().to_string();
                let destination = item.work_item().destination.clone();
                let archive = item.work_item().archive.clone();

                async move {
                    let task = tokio::spawn(process_item(analyzer, options, timeout, item));

                    let result = match task.await {
                        Ok(result) => result,
                        Err(join_error) => {
                            // The temp file was dropped during unwinding; the staged output was not
                            remove_staging(&destination).await;
                            let reason = if join_error.is_panic() {
                                "analyzer panicked".to_string()
                            } else {
                                join_error.to_string()
                            };
                            Err(BatchError::analysis(&file, reason))
                        }
                    };

                    let current = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    match &result {
                        Ok(()) => info!(
                            progress = format!("{}/{}", current, total),
                            archive = %archive.display(),
                            "Created {}",
                            destination.display()
                        ),
                        Err(e) => warn!(
                            progress = format!("{}/{}", current, total),
                            archive = %archive.display(),
                            "Couldn't process file {}. Reason: {}. Skipping...",
                            file,
                            e
                        ),
                    }

                    result
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let report = DispatchReport {
            succeeded,
            failed: results.len() - succeeded,
        };

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Dispatch completed"
        );

        report
    }
}

/// Analyze one item, publish its result and release its temporary file
async fn process_item(
    analyzer: Arc<dyn Analyzer>,
    options: Arc<AnalysisOptions>,
    timeout: Option<Duration>,
    item: MaterializedItem,
) -> Result<(), BatchError> {
    let work_item = item.work_item().clone();
    let file = work_item.member_file_name().to_string();
    let staging = staging_path(&work_item.destination);

    debug!(
        member = %work_item.member,
        temp_file = %item.temp_path().display(),
        "Worker starting analysis"
    );

    let outcome = {
        let run = analyzer.analyze(item.temp_path(), &staging, &options);
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AnalyzerError::Timeout(limit)),
            },
            None => run.await,
        }
    };

    let result = match outcome {
        Ok(()) => tokio::fs::rename(&staging, &work_item.destination)
            .await
            .map_err(|e| BatchError::filesystem(&work_item.destination, e)),
        Err(e) => Err(BatchError::analysis(&file, e)),
    };

    if result.is_err() {
        remove_staging(&work_item.destination).await;
    }

    if let Err(e) = item.release() {
        error!(member = %work_item.member, error = %e, "Failed to remove temporary file");
    }

    result
}

async fn remove_staging(destination: &Path) {
    let staging = staging_path(destination);
    match tokio::fs::remove_file(&staging).await {
        Ok(()) => debug!(path = %staging.display(), "Removed partial result"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %staging.display(), error = %e, "Failed to remove partial result"),
    }
}
