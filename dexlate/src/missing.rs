//! CSV export of terms and records that still need a human translation.

use std::{
    fs::OpenOptions,
    io::BufRead,
    path::Path,
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{error::Error, traits::Source, types::StringRecord};

/// One row of a missing-translations report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MissingTranslation {
    pub resource_id: String,
    pub language_id: String,
    pub english_name: String,
    /// Left empty for a translator to fill in.
    pub translation: String,
}

impl MissingTranslation {
    pub fn new(
        resource_id: impl Into<String>,
        language_id: impl Into<String>,
        english_name: impl Into<String>,
    ) -> Self {
        MissingTranslation {
            resource_id: resource_id.into(),
            language_id: language_id.into(),
            english_name: english_name.into(),
            translation: String::new(),
        }
    }

    /// Rows for records the engine left untranslated.
    pub fn from_untranslated(records: &[StringRecord], language: &str) -> Vec<Self> {
        records
            .iter()
            .map(|r| MissingTranslation::new(&r.id, language, &r.text))
            .collect()
    }
}

impl Source for Vec<MissingTranslation> {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            rows.push(result?);
        }
        Ok(rows)
    }
}

/// Appends `rows` to the CSV at `path`, creating it (and its parent directory) if
/// needed. The header is written only when the file starts out empty.
pub fn append_report<P: AsRef<Path>>(path: P, rows: &[MissingTranslation]) -> Result<usize, Error> {
    let path = path.as_ref();
    if rows.is_empty() {
        return Ok(0);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    info!("Saved {} missing translations in {}", rows.len(), path.display());
    Ok(rows.len())
}
