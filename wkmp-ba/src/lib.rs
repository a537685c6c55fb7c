//! wkmp-ba library interface
//!
//! Batch acoustic analysis of audio members stored in tar archives. Exposes
//! the pipeline components for the binary and for integration testing.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::config::BatchConfig;
pub use crate::error::{BatchError, BatchResult};
