//! All error types for the dexlate crate.
//!
//! Most of these are recoverable at the granularity of one record or one file: the
//! engine logs them and keeps going. Only whole-document I/O failures are fatal, and
//! only for that document.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("malformed id range `{0}`")]
    MalformedRange(String),

    #[error("malformed JSON in {}: {source}", .path.display())]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("template for id `{id}` references undefined variable `{variable}`")]
    TemplateFill { id: String, variable: String },

    #[error("no closing tag to anchor block in `{0}`")]
    UnmatchedInsertionPoint(String),

    #[error("invalid pattern `{pattern}` for id `{id}`: {source}")]
    InvalidPattern {
        id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid language code `{0}`")]
    InvalidLanguage(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

impl Error {
    /// Wraps a JSON error with the path of the file that failed to parse.
    pub fn malformed_json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::MalformedJson {
            path: path.into(),
            source,
        }
    }

    /// Creates a new template fill error.
    pub fn template_fill(id: impl Into<String>, variable: impl Into<String>) -> Self {
        Error::TemplateFill {
            id: id.into(),
            variable: variable.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_not_found_error() {
        let error = Error::ConfigNotFound(PathBuf::from("translations/it/special_cases-it.json"));
        assert_eq!(
            error.to_string(),
            "file not found: translations/it/special_cases-it.json"
        );
    }

    #[test]
    fn test_malformed_range_error() {
        let error = Error::MalformedRange("1.5-3".to_string());
        assert_eq!(error.to_string(), "malformed id range `1.5-3`");
    }

    #[test]
    fn test_malformed_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::malformed_json("type-it.json", json_error);
        assert!(error.to_string().contains("malformed JSON in type-it.json"));
    }

    #[test]
    fn test_template_fill_error() {
        let error = Error::template_fill("20", "group3");
        assert_eq!(
            error.to_string(),
            "template for id `20` references undefined variable `group3`"
        );
    }

    #[test]
    fn test_io_error_is_fatal() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::Io(io_error);
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_debug() {
        let error = Error::InvalidLanguage("??".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("InvalidLanguage"));
    }
}
