//! Batch driver
//!
//! Orchestrates one batch: discover archives, then for each archive in turn
//! plan its work, extract the planned members and hand them to the dispatch
//! pool. Archives are strictly sequential; only the pool runs concurrently.

use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::models::{ArchiveOutcome, BatchSummary, MaterializedItem};
use crate::services::analyzer::Analyzer;
use crate::services::archive_scanner::ArchiveScanner;
use crate::services::dispatch_pool::DispatchPool;
use crate::services::materializer::Materializer;
use crate::services::work_planner::{ArchivePlan, WorkPlanner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Runs a whole batch
pub struct BatchDriver {
    config: BatchConfig,
    scanner: ArchiveScanner,
    planner: WorkPlanner,
    materializer: Materializer,
    pool: DispatchPool,
}

impl BatchDriver {
    pub fn new(config: BatchConfig, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            scanner: ArchiveScanner::new(&config.archive_extension),
            planner: WorkPlanner::from_config(&config),
            materializer: Materializer::from_config(&config),
            pool: DispatchPool::from_config(analyzer, &config),
            config,
        }
    }

    /// Process every archive under the input root
    ///
    /// Archive and item failures are logged and counted; only a failure to
    /// walk the input root itself is returned as an error.
    pub async fn run(&self) -> BatchResult<BatchSummary> {
        let start = Instant::now();

        let archives: Vec<PathBuf> = self
            .scanner
            .scan(&self.config.input_root)
            .map_err(|e| BatchError::enumeration(&self.config.input_root, e))?
            .collect();

        info!(
            input = %self.config.input_root.display(),
            output = %self.config.output_root.display(),
            archives = archives.len(),
            workers = self.pool.workers(),
            recompute_existing = self.config.recompute_existing,
            "Starting batch"
        );

        let mut summary = BatchSummary {
            archives_found: archives.len(),
            ..Default::default()
        };

        for (index, archive) in archives.iter().enumerate() {
            let progress = format!("{}/{}", index + 1, archives.len());
            info!(progress = %progress, archive = %archive.display(), "Processing archive");

            match self.process_archive(archive).await {
                Ok(outcome) => {
                    info!(
                        progress = %progress,
                        archive = %archive.display(),
                        "Archive completed: {}",
                        outcome.display_string()
                    );
                    summary.record_archive(&outcome);
                }
                Err(e) => {
                    error!(
                        progress = %progress,
                        archive = %archive.display(),
                        error = %e,
                        "Couldn't process archive. Skipping..."
                    );
                    summary.record_archive_failure();
                }
            }
        }

        info!(
            elapsed_secs = start.elapsed().as_secs(),
            "Batch completed: {}",
            summary.display_string()
        );

        Ok(summary)
    }

    /// Plan, materialize and dispatch one archive
    pub async fn process_archive(&self, archive: &Path) -> BatchResult<ArchiveOutcome> {
        let (mut outcome, items) = self.prepare_archive(archive).await?;

        let report = self.pool.run(items).await;
        outcome.analyzed = report.succeeded;
        outcome.failed = report.failed;

        Ok(outcome)
    }

    /// Blocking archive work: open, plan and extract every planned member
    ///
    /// The archive handle is dropped before this returns, so no worker ever
    /// sees it.
    async fn prepare_archive(
        &self,
        archive: &Path,
    ) -> BatchResult<(ArchiveOutcome, Vec<MaterializedItem>)> {
        let planner = self.planner.clone();
        let materializer = self.materializer.clone();
        let path = archive.to_path_buf();

        let task = tokio::task::spawn_blocking(move || {
            let ArchivePlan { mut source, work } = planner.plan(&path)?;
            let planned = work.items.len();

            let (items, extraction_failures) = materializer.materialize_all(&mut source, work.items);
            drop(source);

            let outcome = ArchiveOutcome {
                planned,
                skipped: work.skipped,
                dropped: work.dropped + extraction_failures,
                ..Default::default()
            };
            Ok::<_, BatchError>((outcome, items))
        });

        task.await.map_err(|e| BatchError::enumeration(archive, e))?
    }
}
