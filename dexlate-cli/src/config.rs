//! The optional TOML run file for `dexlate apply`.
//!
//! ```toml
//! language = "it"
//! version = "1.4.0"
//! input_dir = "input"
//! default_action = "translate"
//! missing_report = "translations/it/missing/records.csv"
//!
//! [documents]
//! "strings/credits.xml" = "copy"
//! "strings/debug.xml" = "skip"
//!
//! [manifest]
//! name_suffix = " ITA"
//! version_suffix = "-mod_{version}"
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use dexlate::{BatchOptions, DocumentAction, ManifestEdits};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub language: Option<String>,
    /// The translated mod's version, available to `manifest.version_suffix` as `{version}`.
    pub version: Option<String>,
    pub input_dir: Option<PathBuf>,
    pub translations_dir: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub missing_report: Option<PathBuf>,
    pub default_action: Option<DocumentAction>,
    /// Per-document actions keyed by the path listed in `info.xml`.
    pub documents: BTreeMap<String, DocumentAction>,
    pub manifest: ManifestEdits,
}

/// Command-line values that take precedence over the run file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOverrides {
    pub language: Option<String>,
    pub version: Option<String>,
    pub input_dir: Option<PathBuf>,
    pub translations_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub missing_report: Option<PathBuf>,
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
        Self::from_toml_str(&raw).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    /// Merges `overrides` over this file and produces batch options.
    pub fn into_batch_options(self, overrides: ApplyOverrides) -> Result<BatchOptions, String> {
        let language = overrides
            .language
            .or(self.language)
            .ok_or_else(|| {
                "No target language given (use --lang or `language` in the config)".to_string()
            })?;

        let mut options = BatchOptions::new(language);
        if let Some(dir) = overrides.input_dir.or(self.input_dir) {
            options = options.with_input_dir(dir);
        }
        if let Some(dir) = overrides.translations_dir.or(self.translations_dir) {
            options = options.with_translations_dir(dir);
        }
        if let Some(dir) = self.output_root {
            options = options.with_output_root(dir);
        }
        options = options
            .with_output_dir(overrides.output_dir.or(self.output_dir))
            .with_missing_report(overrides.missing_report.or(self.missing_report))
            .with_default_action(self.default_action.unwrap_or_default());
        for (path, action) in self.documents {
            options = options.with_action(path, action);
        }

        let version = overrides.version.or(self.version).or(self.manifest.version.clone());
        Ok(options.with_manifest_edits(self.manifest.with_version(version)))
    }
}
