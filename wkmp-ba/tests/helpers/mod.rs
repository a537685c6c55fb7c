//! Test Helper Utilities
//!
//! Shared utilities for testing wkmp-ba

#![allow(dead_code)]

pub mod archive_builder;
pub mod log_capture;
pub mod mock_analyzer;

pub use archive_builder::ArchiveBuilder;
pub use log_capture::init_test_logging;
pub use mock_analyzer::MockAnalyzer;
