//! # WKMP Common Library
//!
//! Shared code for WKMP binaries:
//! - Configuration file discovery and TOML loading
//! - Setting resolution (command line → environment → TOML → default)
//! - Common error types

pub mod config;
pub mod error;

pub use error::{Error, Result};
