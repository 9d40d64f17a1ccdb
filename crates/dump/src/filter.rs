//! Generation-based dump filtering.
//!
//! Heap dumps of long-lived processes grow append-only; each profiling pass
//! tags its records with the GC generation that produced them. Copying just
//! the lines at or after a cutoff generation gives a much smaller file to
//! re-index. The filter works line-at-a-time on the raw bytes and probes
//! only the two fields it needs, so lines survive byte-identical.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use serde::Deserialize;
use tracing::debug;

use crate::errors::Result;

/// Allocation-site marker of the profiler's own bookkeeping objects.
pub const TRACER_FILE: &str = "__hprof";
/// Struct tag of the allocation tracer's internal DATA objects.
pub const TRACER_STRUCT: &str = "ObjectTracing/allocation_info_tracer";

/// The two fields the filter reads; everything else on the line is ignored.
#[derive(Deserialize)]
struct LineProbe<'a> {
    generation: Option<u64>,
    #[serde(borrow)]
    file: Option<Cow<'a, str>>,
}

/// Line counts reported by a completed filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub copied: usize,
    pub dropped: usize,
}

/// Copies `source` to `destination`, keeping only lines tagged with
/// `generation >= since` whose allocation site is not the tracer's own.
///
/// Kept lines are copied verbatim, in their original order; untagged lines
/// are dropped. The destination is fully flushed before this returns. The
/// scan is strictly sequential; use [`spawn_filter_generation`] to keep it
/// off the caller's thread.
pub fn filter_generation(source: &Path, destination: &Path, since: u64) -> Result<FilterOutcome> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut writer = BufWriter::new(File::create(destination)?);
    let mut outcome = FilterOutcome::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if keep_line(&line, since)? {
            writer.write_all(&line)?;
            outcome.copied += 1;
        } else {
            outcome.dropped += 1;
        }
    }

    writer.flush()?;
    debug!(
        copied = outcome.copied,
        dropped = outcome.dropped,
        "generation filter finished"
    );
    Ok(outcome)
}

/// Runs [`filter_generation`] on its own thread so the caller is not blocked
/// for the scan's duration. There is no cancellation; join the handle for
/// the outcome.
pub fn spawn_filter_generation(
    source: PathBuf,
    destination: PathBuf,
    since: u64,
) -> JoinHandle<Result<FilterOutcome>> {
    thread::spawn(move || filter_generation(&source, &destination, since))
}

fn keep_line(line: &[u8], since: u64) -> Result<bool> {
    let trimmed = trim_line(line);
    if trimmed.is_empty() {
        return Ok(false);
    }
    let probe: LineProbe = serde_json::from_slice(trimmed)?;
    Ok(match probe.generation {
        Some(generation) if generation >= since => probe.file.as_deref() != Some(TRACER_FILE),
        _ => false,
    })
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&byte| byte != b'\n' && byte != b'\r')
        .map_or(0, |index| index + 1);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn keeps_exactly_the_lines_at_or_after_the_cutoff() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let source = dir.path().join("source.heap");
        let destination = dir.path().join("filtered.heap");

        let lines: Vec<String> = (1..=4)
            .map(|generation| {
                format!(
                    r#"{{"address":"0x{generation:012x}","type":"OBJECT","generation":{generation},"memsize":40}}"#
                )
            })
            .collect();
        fs::write(&source, lines.join("\n") + "\n").expect("Failed to write source");

        let outcome = filter_generation(&source, &destination, 3).expect("Failed to filter");

        assert_eq!(outcome, FilterOutcome { copied: 2, dropped: 2 });
        let filtered = fs::read_to_string(&destination).expect("Failed to read destination");
        // Kept lines are byte-identical and in original order.
        assert_eq!(filtered, format!("{}\n{}\n", lines[2], lines[3]));
    }

    #[test]
    fn drops_untagged_lines() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let source = dir.path().join("source.heap");
        let destination = dir.path().join("filtered.heap");

        fs::write(
            &source,
            "{\"type\":\"ROOT\"}\n{\"type\":\"OBJECT\",\"generation\":9,\"memsize\":40}\n",
        )
        .expect("Failed to write source");

        let outcome = filter_generation(&source, &destination, 1).expect("Failed to filter");

        assert_eq!(outcome.copied, 1);
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn drops_tracer_bookkeeping_lines_regardless_of_generation() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let source = dir.path().join("source.heap");
        let destination = dir.path().join("filtered.heap");

        fs::write(
            &source,
            format!(
                "{{\"type\":\"STRING\",\"generation\":9,\"file\":\"{TRACER_FILE}\"}}\n{{\"type\":\"OBJECT\",\"generation\":9}}\n"
            ),
        )
        .expect("Failed to write source");

        let outcome = filter_generation(&source, &destination, 1).expect("Failed to filter");

        assert_eq!(outcome.copied, 1);
        let filtered = fs::read_to_string(&destination).expect("Failed to read destination");
        assert!(!filtered.contains(TRACER_FILE));
    }

    #[test]
    fn filter_runs_off_thread() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let source = dir.path().join("source.heap");
        let destination = dir.path().join("filtered.heap");

        fs::write(&source, "{\"type\":\"OBJECT\",\"generation\":5}\n")
            .expect("Failed to write source");

        let handle = spawn_filter_generation(source, destination.clone(), 5);
        let outcome = handle
            .join()
            .expect("Filter thread panicked")
            .expect("Failed to filter");

        assert_eq!(outcome.copied, 1);
        assert!(destination.exists());
    }
}
