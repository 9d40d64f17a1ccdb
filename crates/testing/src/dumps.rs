use std::fs;
use std::path::Path;

use anyhow::Result;

// Helper to assemble synthetic heap dump fixtures: newline-delimited JSON
// records close enough to the VM's object-space dump format for parser,
// index, and filter tests.
//
// example usage:
// ```rust,ignore
// let temp_dir = TempDir::new().expect("Failed to create temp directory");
// let dump_path = temp_dir.path().join("test.heap");
// DumpBuilder::new()
//     .root()
//     .string("0x0000000000ab", "hi")
//     .class("0x0000000000cd", "Foo")
//     .write(&dump_path);
// ```
#[derive(Default)]
pub struct DumpBuilder {
    lines: Vec<String>,
}

impl DumpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw, pre-serialized dump line.
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn root(self) -> Self {
        self.line(r#"{"type":"ROOT","root":"vm","references":["0x7f0000000000"]}"#)
    }

    pub fn string(self, address: &str, value: &str) -> Self {
        self.line(format!(
            r#"{{"address":"{address}","type":"STRING","value":{value:?},"memsize":40}}"#
        ))
    }

    pub fn class(self, address: &str, name: &str) -> Self {
        self.line(format!(
            r#"{{"address":"{address}","type":"CLASS","name":{name:?},"memsize":520}}"#
        ))
    }

    pub fn module(self, address: &str, name: &str) -> Self {
        self.line(format!(
            r#"{{"address":"{address}","type":"MODULE","name":{name:?},"memsize":520}}"#
        ))
    }

    /// A CLASS record without a name, carrying only its definition site.
    pub fn anonymous_class(self, address: &str, file: &str, line: u64) -> Self {
        self.line(format!(
            r#"{{"address":"{address}","type":"CLASS","file":{file:?},"line":{line},"memsize":520}}"#
        ))
    }

    pub fn object(self, address: &str, class: &str, generation: u64) -> Self {
        self.line(format!(
            r#"{{"address":"{address}","type":"OBJECT","class":"{class}","generation":{generation},"memsize":40}}"#
        ))
    }

    /// Writes the accumulated lines to `path`, newline-terminated.
    pub fn write(self, path: &Path) {
        let mut contents = self.lines.join("\n");
        contents.push('\n');
        fs::write(path, contents).expect("Failed to write dump fixture");
    }
}

/// Reads a dump back as its list of lines, for assertions on filter and
/// diff output.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::to_owned)
        .collect())
}

