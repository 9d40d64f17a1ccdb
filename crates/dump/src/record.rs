//! Per-document record decoding.
//!
//! One dump line maps to one [`Record`]: a sparse, typed view where every
//! field the line does not carry stays `None`. Only structural corruption is
//! an error; ordinary absence never is.

use internment::ArcIntern;
use serde_json::Value;
use strum::{Display, EnumString};

use crate::address;
use crate::errors::{DumpError, Result};

/// Object kinds emitted by the VM's object-space dump.
///
/// The vocabulary is closed; tags with no dedicated handling are carried
/// through as [`Kind::Other`] and decode only the common fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Kind {
    Root,
    Object,
    Class,
    Module,
    Iclass,
    String,
    Array,
    Hash,
    Struct,
    Bignum,
    File,
    Data,
    Match,
    Complex,
    Rational,
    Float,
    Symbol,
    Regexp,
    Imemo,
    Shape,
    Zombie,
    #[strum(default)]
    Other(std::string::String),
}

impl Kind {
    pub fn from_tag(tag: &str) -> Self {
        tag.parse()
            .unwrap_or_else(|_| Kind::Other(tag.to_string()))
    }
}

/// One decoded heap record.
///
/// `memsize` defaults to 0 when the line carries none (the ROOT
/// pseudo-record); every other field is present only when the line is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub kind: Option<Kind>,
    pub address: Option<u64>,
    pub class: Option<u64>,
    pub memsize: u64,
    pub imemo_kind: Option<ArcIntern<String>>,
    pub struct_name: Option<ArcIntern<String>>,
    pub value: Option<String>,
    pub shared: Option<bool>,
    pub references: Option<Vec<u64>>,
    pub edge_name: Option<String>,
    pub file: Option<ArcIntern<String>>,
    pub line: Option<u64>,
}

impl Record {
    /// Decodes one dump document into a sparse record.
    ///
    /// Missing or mistyped fields are omitted. The one structural error is a
    /// shared string whose `references` is missing or not an array.
    pub fn decode(document: &Value) -> Result<Record> {
        let kind = document
            .get("type")
            .and_then(Value::as_str)
            .map(Kind::from_tag);

        let mut record = Record {
            address: address_field(document, "address"),
            // IMEMO "class" fields can be junk upstream; skip them wholesale.
            class: match kind {
                Some(Kind::Imemo) => None,
                _ => address_field(document, "class"),
            },
            memsize: document.get("memsize").and_then(Value::as_u64).unwrap_or(0),
            kind,
            ..Record::default()
        };

        match record.kind {
            Some(Kind::Imemo) => {
                record.imemo_kind = intern_field(document, "imemo_type");
            }
            Some(Kind::Data) => {
                record.struct_name = intern_field(document, "struct");
            }
            Some(Kind::String) => {
                record.value = document
                    .get("value")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                if let Some(shared) = document.get("shared").and_then(Value::as_bool) {
                    record.shared = Some(shared);
                    if shared {
                        record.references = Some(decode_references(document)?);
                    }
                }
            }
            Some(Kind::Shape) => {
                record.edge_name = document
                    .get("edge_name")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
            }
            _ => {}
        }

        record.file = intern_field(document, "file");
        record.line = document.get("line").and_then(Value::as_u64);

        Ok(record)
    }
}

fn address_field(document: &Value, key: &str) -> Option<u64> {
    document
        .get(key)
        .and_then(Value::as_str)
        .map(|text| address::decode(text.as_bytes()))
}

fn intern_field(document: &Value, key: &str) -> Option<ArcIntern<String>> {
    document
        .get(key)
        .and_then(Value::as_str)
        .map(ArcIntern::from_ref)
}

fn decode_references(document: &Value) -> Result<Vec<u64>> {
    match document.get("references") {
        Some(Value::Array(elements)) => Ok(elements
            .iter()
            .filter_map(Value::as_str)
            .map(|reference| address::decode(reference.as_bytes()))
            .collect()),
        Some(_) => Err(DumpError::MalformedRecord(
            "string references field is not an array".to_string(),
        )),
        None => Err(DumpError::MalformedRecord(
            "shared string carries no references array".to_string(),
        )),
    }
}
