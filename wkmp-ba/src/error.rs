//! Error types for wkmp-ba
//!
//! Every variant except `Config` is recoverable at item or archive
//! granularity: the driver logs it and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Batch pipeline error
#[derive(Debug, Error)]
pub enum BatchError {
    /// Archive could not be opened or its member list could not be read.
    /// The whole archive is skipped.
    #[error("Cannot enumerate archive {path}: {reason}")]
    Enumeration { path: PathBuf, reason: String },

    /// A single member could not be extracted. The work item is dropped.
    #[error("Cannot extract member {member}: {reason}")]
    Extraction { member: String, reason: String },

    /// The analyzer failed for one materialized item.
    #[error("Analysis of {file} failed: {reason}")]
    Analysis { file: String, reason: String },

    /// Directory or temp-file creation failed for one item.
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Startup configuration is invalid (fatal)
    #[error("Configuration error: {0}")]
    Config(String),

    /// wkmp-common error
    #[error("Common error: {0}")]
    Common(#[from] wkmp_common::Error),
}

impl BatchError {
    pub fn enumeration(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Enumeration {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction(member: impl Into<String>, reason: impl ToString) -> Self {
        Self::Extraction {
            member: member.into(),
            reason: reason.to_string(),
        }
    }

    pub fn analysis(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::Analysis {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;
