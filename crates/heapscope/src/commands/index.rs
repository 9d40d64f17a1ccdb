use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use heap_dump::parser::DumpParser;
use tracing::info;

pub fn run(dump_path: PathBuf, batch_size: usize) -> Result<()> {
    let mut parser = DumpParser::new();
    let start_time = Instant::now();

    let index = parser
        .build_index(&dump_path, batch_size)
        .with_context(|| format!("Failed to index heap dump: {}", dump_path.display()))?;

    info!(
        "✅ Indexed {} in {:.2}s",
        dump_path.display(),
        start_time.elapsed().as_secs_f64()
    );
    info!("  - Classes: {}", index.class_count());
    info!("  - Strings: {}", index.string_count());
    Ok(())
}
