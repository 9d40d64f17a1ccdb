//! Batched streaming parser for newline-delimited dump files.
//!
//! The file is consumed through a fixed-size byte window: as many whole
//! documents as fit are read in, the partial trailing line is carried into
//! the next fill, and documents are handed out one at a time across window
//! boundaries. The window size is a capacity budget, not a correctness
//! parameter — except that a window too small for a single document fails
//! fast with a distinguished capacity error so callers can retry with a
//! larger budget.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::Value;

use crate::errors::{DumpError, Result};
use crate::filter::{TRACER_FILE, TRACER_STRUCT};
use crate::record::Record;

/// Default parse window of 10MB, enough headroom for dumps with long STRING
/// value lines.
pub const DEFAULT_BATCH_SIZE: usize = 10_000_000;

/// Streaming parser over heap dump files.
///
/// The parser owns a scratch window that is reused across calls, so one
/// instance amortizes its allocation over many dumps. It is single-owner and
/// non-reentrant: calls on the same instance must be serialized.
pub struct DumpParser {
    scratch: Vec<u8>,
}

impl DumpParser {
    pub fn new() -> Self {
        Self {
            scratch: Vec::new(),
        }
    }

    /// Opens `path` and returns a lazy, forward-only stream over its JSON
    /// documents.
    ///
    /// The stream is not restartable; re-scanning means calling `load_many`
    /// again.
    pub fn load_many(&mut self, path: &Path, batch_size: usize) -> Result<DocumentStream<'_>> {
        let file = File::open(path)?;
        self.scratch.clear();
        Ok(DocumentStream {
            reader: BufReader::new(file),
            scratch: &mut self.scratch,
            batch_size: batch_size.max(1),
            cursor: 0,
            eof: false,
            failed: false,
        })
    }

    /// Decodes every qualifying document and invokes `handler` in file order.
    ///
    /// With a `since` cutoff, only records whose `generation` is present and
    /// at or above the cutoff are delivered — the same comparison the
    /// generation filter applies, so an incremental re-scan and a filtered
    /// copy see the same records. Tracer bookkeeping records are always
    /// dropped.
    ///
    /// On error the iteration aborts; records already delivered are an
    /// incomplete prefix the caller must discard or resume with care.
    pub fn each_record<F>(
        &mut self,
        path: &Path,
        batch_size: usize,
        since: Option<u64>,
        mut handler: F,
    ) -> Result<()>
    where
        F: FnMut(Record),
    {
        for document in self.load_many(path, batch_size)? {
            let document = document?;

            if let Some(cutoff) = since {
                match document.get("generation").and_then(Value::as_u64) {
                    Some(generation) if generation >= cutoff => {}
                    // Untagged records count as below the cutoff.
                    _ => continue,
                }
            }
            if document.get("file").and_then(Value::as_str) == Some(TRACER_FILE) {
                continue;
            }
            if document.get("struct").and_then(Value::as_str) == Some(TRACER_STRUCT) {
                continue;
            }

            handler(Record::decode(&document)?);
        }
        Ok(())
    }
}

impl Default for DumpParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy document stream produced by [`DumpParser::load_many`].
pub struct DocumentStream<'a> {
    reader: BufReader<File>,
    scratch: &'a mut Vec<u8>,
    batch_size: usize,
    cursor: usize,
    eof: bool,
    failed: bool,
}

impl DocumentStream<'_> {
    /// Slides the unconsumed tail to the front of the window and tops the
    /// window up from the file. Returns false once nothing is left.
    fn refill(&mut self) -> Result<bool> {
        self.scratch.drain(..self.cursor);
        self.cursor = 0;

        let mut filled = self.scratch.len();
        self.scratch.resize(self.batch_size, 0);
        while filled < self.batch_size {
            let count = self.reader.read(&mut self.scratch[filled..])?;
            if count == 0 {
                self.eof = true;
                break;
            }
            filled += count;
        }
        self.scratch.truncate(filled);
        Ok(!self.scratch.is_empty())
    }

    fn next_document(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(offset) = self.scratch[self.cursor..]
                .iter()
                .position(|&byte| byte == b'\n')
            {
                let line = trim_line(&self.scratch[self.cursor..self.cursor + offset]);
                self.cursor += offset + 1;
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(serde_json::from_slice(line)?));
            }

            if self.eof {
                // Final document without a trailing newline.
                if self.cursor < self.scratch.len() {
                    let line = trim_line(&self.scratch[self.cursor..]);
                    self.cursor = self.scratch.len();
                    if line.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(serde_json::from_slice(line)?));
                }
                return Ok(None);
            }

            // A full window with no complete document: the next document
            // cannot fit in the budget.
            if self.cursor == 0 && self.scratch.len() >= self.batch_size {
                return Err(DumpError::CapacityExceeded {
                    batch_size: self.batch_size,
                });
            }

            if !self.refill()? {
                return Ok(None);
            }
        }
    }
}

impl Iterator for DocumentStream<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_document() {
            Ok(Some(document)) => Some(Ok(document)),
            Ok(None) => None,
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}

fn trim_line(mut line: &[u8]) -> &[u8] {
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    line
}
