//! Archive file scanner
//!
//! Recursive discovery of archive files under the input root. Entries are
//! visited in file-name order within each directory so that repeated runs see
//! archives in the same order.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Archive scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Root could not be resolved to an absolute path
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Archive file scanner
#[derive(Debug, Clone)]
pub struct ArchiveScanner {
    /// Name suffix including the dot, e.g. ".tar"
    suffix: String,
}

impl ArchiveScanner {
    /// Create a scanner matching files that end in `.{extension}`
    pub fn new(extension: &str) -> Self {
        Self {
            suffix: format!(".{}", extension.trim_start_matches('.')),
        }
    }

    /// Lazily walk `root_path` and yield absolute paths of archive files
    ///
    /// Directories without matching files contribute nothing. Entries that
    /// cannot be read are logged and skipped.
    pub fn scan(&self, root_path: &Path) -> Result<impl Iterator<Item = PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        // Made absolute without resolving symlinks: archive paths, and the
        // parent directory names derived from them, keep the names as given
        let root = if root_path.is_absolute() {
            root_path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| ScanError::IoError(format!("{}: {}", root_path.display(), e)))?
                .join(root_path)
        };

        let suffix = self.suffix.clone();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .follow_root_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    None
                }
            })
            // Symlinked archives count; symlinked directories are not descended
            .filter(|entry| {
                entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
            })
            .filter(move |entry| entry.file_name().to_string_lossy().ends_with(&suffix))
            .map(|entry| entry.into_path());

        Ok(walker)
    }
}
