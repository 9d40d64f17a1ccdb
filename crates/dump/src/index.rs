//! Address-keyed lookup indices built in one pass over a dump.
//!
//! Two tables come out of the pass: literal STRING values and CLASS/MODULE
//! display names. Both are keyed by the record's decoded address and fully
//! materialized in memory; duplicate addresses collapse last-write-wins.

use std::path::Path;

use internment::ArcIntern;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::warn;

use crate::address;
use crate::errors::Result;
use crate::parser::DumpParser;
use crate::record::{Kind, Record};

/// Lookup tables for class names and string values, plus a cache for
/// allocation-site gem classification.
#[derive(Debug, Default)]
pub struct HeapIndex {
    classes: FxHashMap<u64, ArcIntern<String>>,
    strings: FxHashMap<u64, String>,
    gems: FxHashMap<String, ArcIntern<String>>,
}

impl DumpParser {
    /// Builds both lookup tables in a single pass over the dump.
    ///
    /// Documents without a `type` field are skipped entirely. Any capacity
    /// or decode error aborts the build; there is no partial index.
    pub fn build_index(&mut self, path: &Path, batch_size: usize) -> Result<HeapIndex> {
        let mut index = HeapIndex::default();

        for document in self.load_many(path, batch_size)? {
            let document = document?;
            let Some(kind) = document.get("type").and_then(Value::as_str) else {
                continue;
            };

            match kind {
                "STRING" => {
                    if let Some(value) = document.get("value").and_then(Value::as_str) {
                        index.strings.insert(address_of(&document), value.to_owned());
                    }
                }
                "CLASS" | "MODULE" => {
                    if let Some(name) = class_name_of(&document) {
                        index.classes.insert(address_of(&document), name);
                    }
                }
                _ => {}
            }
        }

        Ok(index)
    }
}

fn address_of(document: &Value) -> u64 {
    document
        .get("address")
        .and_then(Value::as_str)
        .map(|text| address::decode(text.as_bytes()))
        // The ROOT pseudo-object carries no address.
        .unwrap_or(0)
}

fn class_name_of(document: &Value) -> Option<ArcIntern<String>> {
    if let Some(name) = document.get("name").and_then(Value::as_str) {
        return Some(ArcIntern::from_ref(name));
    }
    // Anonymous classes fall back to their definition site.
    let file = document.get("file").and_then(Value::as_str)?;
    let line = document.get("line").and_then(Value::as_u64)?;
    Some(ArcIntern::new(format!("<Class {file}:{line}>")))
}

impl HeapIndex {
    pub fn class_name(&self, address: u64) -> Option<&str> {
        self.classes.get(&address).map(|name| name.as_str())
    }

    pub fn string(&self, address: u64) -> Option<&str> {
        self.strings.get(&address).map(String::as_str)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Resolves the display class of a decoded record.
    ///
    /// Kinds with an implied class come from a fixed table; IMEMO and DATA
    /// records are labeled by their secondary tag; OBJECT and STRUCT records
    /// resolve through the class table. Anything else contributes nothing.
    pub fn guess_class(&self, record: &Record) -> Option<ArcIntern<String>> {
        let kind = record.kind.as_ref()?;
        if let Some(builtin) = builtin_class_name(kind) {
            return Some(ArcIntern::from_ref(builtin));
        }

        match kind {
            Kind::Imemo => Some(ArcIntern::new(format!(
                "<{}> (IMEMO)",
                record.imemo_kind.as_ref().map_or("unknown", |tag| tag.as_str())
            ))),
            Kind::Data => Some(ArcIntern::new(format!(
                "<{}> (DATA)",
                record.struct_name.as_ref().map_or("unknown", |tag| tag.as_str())
            ))),
            Kind::Object | Kind::Struct => {
                let name = self.classes.get(&record.class?).cloned();
                if name.is_none() {
                    warn!(address = record.address, "could not infer class name of object");
                }
                name
            }
            other => {
                warn!(kind = %other, "could not infer class of record");
                None
            }
        }
    }

    /// Literal or shared value of a STRING record.
    ///
    /// Shared strings carry no value of their own; their first reference
    /// points at the interned string they alias.
    pub fn string_value<'a>(&'a self, record: &'a Record) -> Option<&'a str> {
        if let Some(value) = record.value.as_deref() {
            return Some(value);
        }
        if record.shared == Some(true) {
            let first = record.references.as_ref()?.first()?;
            return self.strings.get(first).map(String::as_str);
        }
        None
    }

    /// Coarse origin classification of an allocation-site path: gem name,
    /// "rubygems", a stdlib module, an app directory, or "other". Results
    /// are cached per path.
    pub fn guess_gem(&mut self, path: &str) -> ArcIntern<String> {
        if let Some(category) = self.gems.get(path) {
            return category.clone();
        }
        let category = classify_path(path);
        self.gems.insert(path.to_owned(), category.clone());
        category
    }
}

/// Display names for kinds whose class is implied by the kind itself.
fn builtin_class_name(kind: &Kind) -> Option<&'static str> {
    match kind {
        Kind::File => Some("File"),
        Kind::Iclass => Some("ICLASS"),
        Kind::Complex => Some("Complex"),
        Kind::Rational => Some("Rational"),
        Kind::Bignum => Some("Bignum"),
        Kind::Float => Some("Float"),
        Kind::Array => Some("Array"),
        Kind::String => Some("String"),
        Kind::Hash => Some("Hash"),
        Kind::Symbol => Some("Symbol"),
        Kind::Module => Some("Module"),
        Kind::Class => Some("Class"),
        Kind::Regexp => Some("Regexp"),
        Kind::Match => Some("MatchData"),
        Kind::Root => Some("<VM Root>"),
        _ => None,
    }
}

static GEM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".*/gems/(?P<gemname>[^/]+)").expect("gem regex compiles"));
static RUBYGEMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/rubygems[./]").expect("rubygems regex compiles"));
static STDLIB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ruby/\d+\.[^/]+/(?P<stdlib>[^/.]+)").expect("stdlib regex compiles"));
static APP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<app>[^/]+/(?:bin|app|lib))").expect("app regex compiles"));

fn classify_path(path: &str) -> ArcIntern<String> {
    if let Some(captures) = GEM_NAME.captures(path) {
        ArcIntern::from_ref(&captures["gemname"])
    } else if RUBYGEMS.is_match(path) {
        ArcIntern::from_ref("rubygems")
    } else if let Some(captures) = STDLIB.captures(path) {
        ArcIntern::from_ref(&captures["stdlib"])
    } else if let Some(captures) = APP.captures(path) {
        ArcIntern::from_ref(&captures["app"])
    } else {
        ArcIntern::from_ref("other")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(document: Value) -> Record {
        Record::decode(&document).expect("Failed to decode record")
    }

    #[test]
    fn guesses_builtin_classes_from_kind() {
        let index = HeapIndex::default();
        let array = record(json!({"address": "0xab", "type": "ARRAY", "memsize": 40}));
        let root = record(json!({"type": "ROOT"}));

        assert_eq!(index.guess_class(&array).expect("builtin").as_str(), "Array");
        assert_eq!(index.guess_class(&root).expect("builtin").as_str(), "<VM Root>");
    }

    #[test]
    fn labels_imemo_and_data_records_by_tag() {
        let index = HeapIndex::default();
        let imemo = record(json!({"type": "IMEMO", "imemo_type": "env"}));
        let data = record(json!({"type": "DATA", "struct": "something"}));
        let bare_data = record(json!({"type": "DATA"}));

        assert_eq!(index.guess_class(&imemo).expect("imemo").as_str(), "<env> (IMEMO)");
        assert_eq!(index.guess_class(&data).expect("data").as_str(), "<something> (DATA)");
        assert_eq!(
            index.guess_class(&bare_data).expect("data").as_str(),
            "<unknown> (DATA)"
        );
    }

    #[test]
    fn resolves_object_classes_through_the_table() {
        let mut index = HeapIndex::default();
        index
            .classes
            .insert(205, ArcIntern::from_ref("User"));

        let known = record(json!({"type": "OBJECT", "class": "0x0000000000cd"}));
        let unknown = record(json!({"type": "OBJECT", "class": "0x0000000000ff"}));
        let classless = record(json!({"type": "OBJECT"}));

        assert_eq!(index.guess_class(&known).expect("class").as_str(), "User");
        assert_eq!(index.guess_class(&unknown), None);
        assert_eq!(index.guess_class(&classless), None);
    }

    #[test]
    fn string_value_follows_shared_references() {
        let mut index = HeapIndex::default();
        index.strings.insert(171, "interned".to_string());

        let literal = record(json!({"type": "STRING", "value": "plain"}));
        let shared = record(json!({
            "type": "STRING",
            "shared": true,
            "references": ["0x0000000000ab"]
        }));

        assert_eq!(index.string_value(&literal), Some("plain"));
        assert_eq!(index.string_value(&shared), Some("interned"));
    }

    #[test]
    fn classifies_allocation_site_paths() {
        let mut index = HeapIndex::default();

        assert_eq!(
            index
                .guess_gem("/usr/local/bundle/gems/rake-13.0.6/lib/rake/task.rb")
                .as_str(),
            "rake-13.0.6"
        );
        assert_eq!(
            index.guess_gem("/usr/local/lib/ruby/3.2.0/rubygems/specification.rb").as_str(),
            "rubygems"
        );
        assert_eq!(
            index.guess_gem("/usr/local/lib/ruby/3.2.0/json/common.rb").as_str(),
            "json"
        );
        assert_eq!(index.guess_gem("myapp/lib/billing.rb").as_str(), "myapp/lib");
        assert_eq!(index.guess_gem("eval").as_str(), "other");
        // Second lookup hits the cache.
        assert_eq!(index.guess_gem("eval").as_str(), "other");
    }
}
