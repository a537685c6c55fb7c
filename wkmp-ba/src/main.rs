//! Batch Analysis (wkmp-ba) - Main entry point
//!
//! Walks an input tree for tar archives, extracts every audio member and runs
//! the acoustic analyzer on it, writing one JSON result per member under the
//! output root. Existing results are kept unless recomputation is forced.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wkmp_ba::config::{BatchConfig, ConfigOverrides, TomlConfig, MODULE_NAME};
use wkmp_ba::services::{BatchDriver, EssentiaAnalyzer};
use wkmp_common::config::{expand_home, find_config_file, load_toml_config};

/// Command-line arguments for wkmp-ba
#[derive(Parser, Debug)]
#[command(name = "wkmp-ba")]
#[command(about = "Batch acoustic analysis of audio stored in tar archives")]
#[command(version)]
struct Args {
    /// Directory scanned recursively for archives
    #[arg(short, long, env = "WKMP_BA_INPUT")]
    input: PathBuf,

    /// Root directory for analysis results
    #[arg(short, long, env = "WKMP_BA_OUTPUT")]
    output: PathBuf,

    /// Reanalyze members whose result already exists
    #[arg(short, long)]
    recompute_existing: bool,

    /// Concurrent analyzer workers (default: CPU count)
    #[arg(short, long, env = "WKMP_BA_JOBS")]
    jobs: Option<usize>,

    /// Configuration file (default: ~/.config/wkmp/wkmp-ba.toml)
    #[arg(short, long, env = "WKMP_BA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let toml_config = load_config_file(args.config.as_ref())?;

    // Initialize tracing; RUST_LOG takes precedence over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wkmp_ba={}", toml_config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting WKMP Batch Analysis v{} ({} built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = BatchConfig::resolve(
        ConfigOverrides {
            input: args.input,
            output: args.output,
            recompute_existing: args.recompute_existing,
            workers: args.jobs,
        },
        toml_config,
    )
    .context("Failed to resolve configuration")?;

    config.validate().context("Invalid configuration")?;

    info!("Input folder: {}", config.input_root.display());
    info!("Output folder: {}", config.output_root.display());

    let analyzer = EssentiaAnalyzer::new(config.analyzer_command.clone());
    analyzer
        .check_available()
        .await
        .with_context(|| format!("Analyzer '{}' is not available", analyzer.command()))?;
    info!("Analyzer: {}", analyzer.command());

    let driver = BatchDriver::new(config, Arc::new(analyzer));
    let summary = driver.run().await.context("Batch failed")?;

    if summary.failed > 0 || summary.archives_failed > 0 {
        warn!("Finished with failures: {}", summary.display_string());
    } else {
        info!("Finished: {}", summary.display_string());
    }

    Ok(())
}

/// Load `wkmp-ba.toml`
///
/// An explicitly named file must exist. Without one the platform config
/// directory is searched, and built-in defaults apply when nothing is found.
fn load_config_file(explicit: Option<&PathBuf>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            let path = expand_home(path);
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path)
        }
        None => find_config_file(MODULE_NAME),
    };

    match path {
        Some(path) => load_toml_config(&path)
            .with_context(|| format!("Failed to load config file {}", path.display())),
        None => Ok(TomlConfig::default()),
    }
}
