//! Batch statistics
//!
//! Counts are accumulated per archive and folded into one summary that the
//! binary reports when the batch completes.

/// Result counts for one archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveOutcome {
    /// Audio members retained for processing
    pub planned: usize,
    /// Members whose destination already existed
    pub skipped: usize,
    /// Members lost before dispatch (extraction or filesystem failure)
    pub dropped: usize,
    /// Results published
    pub analyzed: usize,
    /// Analyzer failures
    pub failed: usize,
}

impl ArchiveOutcome {
    pub fn display_string(&self) -> String {
        format!(
            "{} analyzed, {} failed, {} skipped, {} dropped",
            self.analyzed, self.failed, self.skipped, self.dropped
        )
    }
}

/// Whole-batch summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Archives discovered under the input root
    pub archives_found: usize,
    /// Archives that could not be opened or listed
    pub archives_failed: usize,
    pub planned: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub analyzed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record_archive(&mut self, outcome: &ArchiveOutcome) {
        self.planned += outcome.planned;
        self.skipped += outcome.skipped;
        self.dropped += outcome.dropped;
        self.analyzed += outcome.analyzed;
        self.failed += outcome.failed;
    }

    pub fn record_archive_failure(&mut self) {
        self.archives_failed += 1;
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} archives ({} failed): {} analyzed, {} failed, {} skipped, {} dropped",
            self.archives_found,
            self.archives_failed,
            self.analyzed,
            self.failed,
            self.skipped,
            self.dropped
        )
    }
}
