//! Scanning and rewriting `<string id="…">…</string>` records inside a document.
//!
//! Documents are not parsed as XML. Only flat, non-nested records of the literal shape
//! `<string id="ID" ...>TEXT</string>` are recognized, and every byte outside a
//! rewritten `TEXT` span is preserved as-is, entities and whitespace included.

use std::{fs::File, io::Read, ops::Range, path::Path};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{error::Error, types::StringRecord};

lazy_static! {
    static ref STRING_RECORD: Regex =
        Regex::new(r#"(?s)(<string\s+id="([^"]+)"[^>]*>)(.*?)(</string>)"#).unwrap();
}

/// One record located in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpan<'a> {
    /// Byte range of the whole element in the document.
    pub range: Range<usize>,
    pub opening_tag: &'a str,
    pub id: &'a str,
    /// Element content exactly as written.
    pub raw_text: &'a str,
    pub closing_tag: &'a str,
}

impl<'a> RecordSpan<'a> {
    /// The content with surrounding whitespace removed.
    pub fn text(&self) -> &'a str {
        self.raw_text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.text().is_empty()
    }

    pub fn to_record(&self) -> StringRecord {
        StringRecord::new(self.id, self.text())
    }

    /// The element with its content replaced by `text`.
    pub fn with_text(&self, text: &str) -> String {
        format!("{}{}{}", self.opening_tag, text, self.closing_tag)
    }
}

/// Finds every record in `document`, in document order.
pub fn scan(document: &str) -> Vec<RecordSpan<'_>> {
    STRING_RECORD
        .captures_iter(document)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(RecordSpan {
                range: whole.range(),
                opening_tag: caps.get(1)?.as_str(),
                id: caps.get(2)?.as_str(),
                raw_text: caps.get(3)?.as_str(),
                closing_tag: caps.get(4)?.as_str(),
            })
        })
        .collect()
}

/// Rebuilds `document`, letting `replace` rewrite each record.
///
/// `replace` returns the new element text, or `None` to keep the record's original
/// bytes. Records are visited in document order.
pub fn rewrite<F>(document: &str, mut replace: F) -> String
where
    F: FnMut(&RecordSpan<'_>) -> Option<String>,
{
    let mut out = String::with_capacity(document.len());
    let mut cursor = 0;
    for span in scan(document) {
        out.push_str(&document[cursor..span.range.start]);
        match replace(&span) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&document[span.range.clone()]),
        }
        cursor = span.range.end;
    }
    out.push_str(&document[cursor..]);
    out
}

/// Reads a document, detecting a UTF-8 or UTF-16 BOM and decoding to UTF-8.
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<String, Error> {
    let file = File::open(path).map_err(Error::Io)?;
    let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
        .bom_override(true)
        .build(file);

    let mut decoded = String::new();
    decoder.read_to_string(&mut decoded).map_err(Error::Io)?;
    Ok(decoded)
}
