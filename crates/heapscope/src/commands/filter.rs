use std::path::PathBuf;

use anyhow::{Context, Result};
use heap_dump::filter::filter_generation;
use tracing::info;

pub fn run(source: PathBuf, destination: PathBuf, since: u64) -> Result<()> {
    let outcome = filter_generation(&source, &destination, since)
        .with_context(|| format!("Failed to filter heap dump: {}", source.display()))?;

    info!(
        "✅ Wrote {} ({} records kept, {} dropped)",
        destination.display(),
        outcome.copied,
        outcome.dropped
    );
    Ok(())
}
