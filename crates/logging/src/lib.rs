//! This crate provides logging initialization for the heapscope CLI.
//!
//! Logs go to STDOUT. The default filter is `info`; `RUST_LOG` overrides it,
//! and the CLI's `--verbose` flag forces `debug`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}
