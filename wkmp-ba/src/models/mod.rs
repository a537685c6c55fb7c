//! Data models for the batch pipeline

pub mod batch_summary;
pub mod work_item;

pub use batch_summary::{ArchiveOutcome, BatchSummary};
pub use work_item::{MaterializedItem, WorkItem};
