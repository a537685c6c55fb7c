//! Item materialization
//!
//! The analyzer reads from a real file path, so each planned member is copied
//! out of its archive into a named temporary file before dispatch. The
//! temporary file belongs to the returned `MaterializedItem` and is deleted
//! when that item is released or dropped.

use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::models::{MaterializedItem, WorkItem};
use crate::services::archive_reader::MemberSource;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Prefix of every temporary file created for a batch
pub const TEMP_PREFIX: &str = "wkmp_ba_";

/// Extracts archive members into temporary files
#[derive(Debug, Clone)]
pub struct Materializer {
    /// Directory for temporary files (system temp dir when `None`)
    temp_dir: Option<PathBuf>,
    /// Temp file suffix identifying the content as audio, e.g. ".wav"
    suffix: String,
}

impl Materializer {
    pub fn new(temp_dir: Option<PathBuf>, audio_extension: &str) -> Self {
        Self {
            temp_dir,
            suffix: format!(".{}", audio_extension.trim_start_matches('.')),
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.temp_dir.clone(), &config.audio_extension)
    }

    /// Copy one member into a fresh temporary file
    pub fn materialize<S: MemberSource>(
        &self,
        source: &mut S,
        item: WorkItem,
    ) -> BatchResult<MaterializedItem> {
        if !source.contains(&item.member) {
            return Err(BatchError::extraction(&item.member, "member not found in archive"));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(&self.suffix);

        let created = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut temp_file = created.map_err(|e| {
            let dir = self.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
            BatchError::filesystem(dir, e)
        })?;

        let bytes = source
            .copy_member(&item.member, temp_file.as_file_mut())
            .and_then(|bytes| temp_file.as_file_mut().flush().map(|_| bytes))
            .map_err(|e| BatchError::extraction(&item.member, e))?;

        debug!(
            member = %item.member,
            temp_file = %temp_file.path().display(),
            bytes,
            "Member extracted"
        );

        Ok(MaterializedItem::new(item, temp_file))
    }

    /// Materialize every item of one archive
    ///
    /// Items that fail are logged and dropped; the second value counts them.
    pub fn materialize_all<S: MemberSource>(
        &self,
        source: &mut S,
        items: Vec<WorkItem>,
    ) -> (Vec<MaterializedItem>, usize) {
        let mut materialized = Vec::with_capacity(items.len());
        let mut dropped = 0;

        for item in items {
            let member = item.member.clone();
            match self.materialize(source, item) {
                Ok(ready) => materialized.push(ready),
                Err(e) => {
                    warn!(member = %member, error = %e, "Couldn't extract member. Skipping...");
                    dropped += 1;
                }
            }
        }

        (materialized, dropped)
    }
}
