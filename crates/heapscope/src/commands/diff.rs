use std::path::PathBuf;

use anyhow::{Context, Result};
use heap_dump::analyzer::HeapDiff;
use heap_dump::dump::Dump;
use tracing::info;

pub fn run(report_directory: PathBuf) -> Result<()> {
    let report = HeapDiff::open(&report_directory).with_context(|| {
        format!(
            "Failed to open report directory: {}",
            report_directory.display()
        )
    })?;
    info!(
        "Diffing {} from generation {}",
        report_directory.display(),
        report.generation()
    );

    let allocated = report.allocated_diff()?;
    info!(
        "✅ Allocated diff: {} ({} records)",
        allocated.path().display(),
        allocated.line_count()?
    );

    if Dump::open(&report_directory, "retained").exists() {
        let retained = report.retained_diff()?;
        info!(
            "✅ Retained diff: {} ({} records)",
            retained.path().display(),
            retained.line_count()?
        );
    }

    Ok(())
}
