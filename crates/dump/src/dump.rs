//! File handle over one heap dump, with cheap line-level operations.
//!
//! Whole-dump diffing does not need decoded records, only each line's
//! address. The dump serializer emits `{"address":"0x` followed by 12 hex
//! digits as the prefix of every line that has an address, so the digits sit
//! at a fixed byte offset and can be sliced out without parsing JSON.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::address;
use crate::errors::Result;

/// Byte range of the address digits on a line carrying an address.
const ADDRESS_DIGITS: Range<usize> = 14..26;

/// Handle to one heap dump file on disk.
#[derive(Debug, Clone)]
pub struct Dump {
    path: PathBuf,
}

impl Dump {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens `<dir>/<name>.heap`.
    pub fn open(dir: &Path, name: &str) -> Self {
        Self::new(dir.join(format!("{name}.heap")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Number of records (lines) in the dump.
    pub fn line_count(&self) -> Result<usize> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut line = Vec::new();
        let mut count = 0;
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(count);
            }
            count += 1;
        }
    }

    /// Invokes `handler` with every raw line and its extracted address.
    ///
    /// Lines without the fixed address prefix (ROOT entries and malformed
    /// lines) report address 0.
    pub fn each_line_with_address<F>(&self, mut handler: F) -> Result<()>
    where
        F: FnMut(&[u8], u64) -> Result<()>,
    {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(());
            }
            handler(&line, quick_address(&line))?;
        }
    }

    /// The set of addresses present in the dump.
    pub fn addresses(&self) -> Result<FxHashSet<u64>> {
        let mut index = FxHashSet::default();
        self.each_line_with_address(|_line, address| {
            index.insert(address);
            Ok(())
        })?;
        Ok(index)
    }

    /// Writes every line of `self` whose address is absent from `baseline`,
    /// returning the number of lines written.
    pub fn diff(&self, baseline: &Dump, out: &mut impl Write) -> Result<usize> {
        let baseline_addresses = baseline.addresses()?;
        let mut written = 0;
        self.each_line_with_address(|line, address| {
            if !baseline_addresses.contains(&address) {
                out.write_all(line)?;
                written += 1;
            }
            Ok(())
        })?;
        Ok(written)
    }
}

fn quick_address(line: &[u8]) -> u64 {
    match line.get(ADDRESS_DIGITS) {
        Some(digits) if digits.iter().all(u8::is_ascii_hexdigit) => address::decode_digits(digits),
        _ => 0,
    }
}
