//! Work planning for one archive
//!
//! Decides which audio members of an archive need analysis and where each
//! result goes. Destinations are a pure function of the archive's parent
//! directory name and the member's file stem, which keeps skip-existing
//! stable across reruns.

use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::models::WorkItem;
use crate::services::archive_reader::{MemberSource, TarArchive};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Compute the result path for one archive member
///
/// `<output_root>/<archive parent dir name>/<member file stem>.<extension>`
pub fn destination_path(output_root: &Path, archive: &Path, member: &str, extension: &str) -> PathBuf {
    let group = archive
        .parent()
        .and_then(|p| p.file_name())
        .map(PathBuf::from)
        .unwrap_or_default();

    let stem = Path::new(member)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| member.to_string());

    output_root
        .join(group)
        .join(format!("{}.{}", stem, extension))
}

/// Work retained for one archive
#[derive(Debug, Default)]
pub struct PlannedWork {
    /// Items to materialize, in member-list order
    pub items: Vec<WorkItem>,
    /// Members skipped because their destination already exists
    pub skipped: usize,
    /// Members dropped during planning (destination directory failure or collision)
    pub dropped: usize,
}

/// An opened archive together with its planned work
#[derive(Debug)]
pub struct ArchivePlan<S> {
    pub source: S,
    pub work: PlannedWork,
}

/// Work planner
#[derive(Debug, Clone)]
pub struct WorkPlanner {
    output_root: PathBuf,
    /// Member name suffix including the dot, e.g. ".wav"
    audio_suffix: String,
    result_extension: String,
    recompute_existing: bool,
}

impl WorkPlanner {
    pub fn new(
        output_root: impl Into<PathBuf>,
        audio_extension: &str,
        result_extension: &str,
        recompute_existing: bool,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            audio_suffix: format!(".{}", audio_extension.trim_start_matches('.')),
            result_extension: result_extension.trim_start_matches('.').to_string(),
            recompute_existing,
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(
            &config.output_root,
            &config.audio_extension,
            config.analysis.result_extension(),
            config.recompute_existing,
        )
    }

    /// Destination for `member` of `archive` under this planner's output root
    pub fn destination_for(&self, archive: &Path, member: &str) -> PathBuf {
        destination_path(&self.output_root, archive, member, &self.result_extension)
    }

    /// Open `archive_path` and plan its audio members
    pub fn plan(&self, archive_path: &Path) -> BatchResult<ArchivePlan<TarArchive>> {
        let source = TarArchive::open(archive_path)
            .map_err(|e| BatchError::enumeration(archive_path, e))?;

        let work = self.plan_members(archive_path, &source);

        Ok(ArchivePlan { source, work })
    }

    /// Plan the audio members listed by `source`
    ///
    /// Existing destinations are skipped unless recomputation is forced.
    /// The parent directory of every retained destination is created here,
    /// before any worker starts writing.
    pub fn plan_members<S: MemberSource>(&self, archive_path: &Path, source: &S) -> PlannedWork {
        let mut work = PlannedWork::default();
        let mut seen = HashSet::new();

        for member in source.member_names() {
            if !member.ends_with(&self.audio_suffix) {
                debug!(member = %member, "Ignoring non-audio member");
                continue;
            }

            let destination = self.destination_for(archive_path, &member);

            if !self.recompute_existing && destination.exists() {
                info!("{} already exists. Skipping...", destination.display());
                work.skipped += 1;
                continue;
            }

            if !seen.insert(destination.clone()) {
                warn!(
                    archive = %archive_path.display(),
                    member = %member,
                    "Destination {} already claimed by another member, dropping",
                    destination.display()
                );
                work.dropped += 1;
                continue;
            }

            if let Some(parent) = destination.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    let err = BatchError::filesystem(parent, e);
                    warn!(member = %member, error = %err, "Cannot prepare destination, dropping");
                    work.dropped += 1;
                    continue;
                }
            }

            work.items.push(WorkItem::new(archive_path, member, destination));
        }

        work
    }
}
