//! Batch pipeline components
//!
//! Leaf to root: archive scanner, archive reader, work planner,
//! materializer, analyzer, dispatch pool and the batch driver that ties
//! them together.

pub mod analyzer;
pub mod archive_reader;
pub mod archive_scanner;
pub mod batch_driver;
pub mod dispatch_pool;
pub mod materializer;
pub mod work_planner;

pub use analyzer::{AnalysisOptions, Analyzer, AnalyzerError, EssentiaAnalyzer};
pub use archive_reader::{MemberSource, TarArchive};
pub use archive_scanner::{ArchiveScanner, ScanError};
pub use batch_driver::BatchDriver;
pub use dispatch_pool::{DispatchPool, DispatchReport};
pub use materializer::Materializer;
pub use work_planner::{destination_path, ArchivePlan, PlannedWork, WorkPlanner};
