//! Planned and materialized units of work

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One audio member of one archive, paired with its result destination
///
/// Unique per (archive, member) and immutable once planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Archive the member lives in
    pub archive: PathBuf,
    /// Member name exactly as listed by the archive
    pub member: String,
    /// Where the analyzer result is published
    pub destination: PathBuf,
}

impl WorkItem {
    pub fn new(archive: impl Into<PathBuf>, member: impl Into<String>, destination: PathBuf) -> Self {
        Self {
            archive: archive.into(),
            member: member.into(),
            destination,
        }
    }

    /// Last path component of the member name (used in log lines)
    pub fn member_file_name(&self) -> &str {
        self.member.rsplit('/').next().unwrap_or(&self.member)
    }
}

/// A work item whose bytes have been extracted to a temporary file
///
/// The temporary file is owned by this value. Dropping it (on any path,
/// including unwinding) deletes the file; `release` deletes it explicitly
/// and reports any deletion error.
#[derive(Debug)]
pub struct MaterializedItem {
    item: WorkItem,
    temp_file: NamedTempFile,
}

impl MaterializedItem {
    pub fn new(item: WorkItem, temp_file: NamedTempFile) -> Self {
        Self { item, temp_file }
    }

    pub fn work_item(&self) -> &WorkItem {
        &self.item
    }

    /// Path of the extracted audio handed to the analyzer
    pub fn temp_path(&self) -> &Path {
        self.temp_file.path()
    }

    /// Delete the temporary file now
    pub fn release(self) -> std::io::Result<()> {
        self.temp_file.close()
    }
}
