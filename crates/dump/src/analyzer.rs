//! Report-directory analysis: deriving diff dumps on demand.
//!
//! A profiling run leaves a report directory behind. Newer runs record the
//! GC generation at which profiling started (`generation.info`) and diff by
//! generation tag; dumps that predate generation tags are diffed as a
//! baseline/allocated/retained triple of address sets. In both cases the
//! derived diff files are written next to their sources and reused on later
//! runs.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::info;

use crate::dump::Dump;
use crate::errors::{DumpError, Result};
use crate::filter;

/// Generation-based report diffing.
pub struct HeapDiff {
    report_directory: PathBuf,
    generation: u64,
}

impl HeapDiff {
    /// Opens a report directory, reading its recorded start generation.
    pub fn open(report_directory: impl Into<PathBuf>) -> Result<Self> {
        let report_directory = report_directory.into();
        let info_path = report_directory.join("generation.info");
        let contents = fs::read_to_string(&info_path)?;
        let generation = contents.trim().parse().map_err(|_| {
            DumpError::InvalidReport(format!(
                "{} does not hold a generation number",
                info_path.display()
            ))
        })?;
        Ok(Self {
            report_directory,
            generation,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Everything allocated at or after the profiling start generation.
    pub fn allocated_diff(&self) -> Result<Dump> {
        self.build_diff("allocated")
    }

    /// Everything still retained that was allocated while profiling.
    pub fn retained_diff(&self) -> Result<Dump> {
        self.build_diff("retained")
    }

    fn build_diff(&self, name: &str) -> Result<Dump> {
        let source = Dump::open(&self.report_directory, name);
        let diff = Dump::open(&self.report_directory, &format!("{name}-diff"));
        if !diff.exists() {
            let outcome = filter::filter_generation(source.path(), diff.path(), self.generation)?;
            info!(
                name,
                copied = outcome.copied,
                dropped = outcome.dropped,
                "derived generation diff"
            );
        }
        Ok(diff)
    }
}

/// Address-set analysis over a baseline/allocated/retained dump triple.
pub struct Analyzer {
    report_directory: PathBuf,
    baseline: Dump,
    allocated: Dump,
    retained: Dump,
}

impl Analyzer {
    pub fn open(report_directory: impl Into<PathBuf>) -> Self {
        let report_directory = report_directory.into();
        Self {
            baseline: Dump::open(&report_directory, "baseline"),
            allocated: Dump::open(&report_directory, "allocated"),
            retained: Dump::open(&report_directory, "retained"),
            report_directory,
        }
    }

    /// Objects in `allocated` that were not in `baseline`.
    pub fn allocated_diff(&self) -> Result<Dump> {
        self.build_diff("allocated-diff", &self.baseline, &self.allocated)
    }

    /// Objects in `retained` that were not in `baseline`.
    pub fn retained_diff(&self) -> Result<Dump> {
        self.build_diff("retained-diff", &self.baseline, &self.retained)
    }

    /// Objects from `baseline` that are gone from `retained`.
    pub fn freed_diff(&self) -> Result<Dump> {
        self.build_diff("freed-diff", &self.retained, &self.baseline)
    }

    fn build_diff(&self, name: &str, base: &Dump, extra: &Dump) -> Result<Dump> {
        let diff = Dump::new(self.report_directory.join(format!("{name}.heap")));
        if !diff.exists() {
            let mut out = BufWriter::new(File::create(diff.path())?);
            let written = extra.diff(base, &mut out)?;
            out.flush()?;
            info!(name, written, "derived address diff");
        }
        Ok(diff)
    }
}
