//! Whole-mod runs: language discovery, conventional directory layout, and applying a
//! translate/copy/skip decision to every document a manifest lists.

use std::{
    collections::BTreeMap,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::{
    dictionary::{Dictionaries, is_dictionary_file},
    document::read_document,
    engine::{Engine, TranslateOptions, TranslatedDocument},
    error::Error,
    manifest::{MANIFEST_FILE, Manifest, ManifestEdits},
    missing::{MissingTranslation, append_report},
    special_cases::SpecialCases,
    traits::Source,
    types::TranslationStats,
};

/// Files copied verbatim from the input directory when present.
pub const DEFAULT_ASSETS: &[&str] = &["icon.png"];

/// What to do with one document of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentAction {
    #[default]
    Translate,
    Copy,
    Skip,
}

impl Display for DocumentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentAction::Translate => write!(f, "translate"),
            DocumentAction::Copy => write!(f, "copy"),
            DocumentAction::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for DocumentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "translate" | "y" | "yes" => Ok(DocumentAction::Translate),
            "copy" | "n" | "no" => Ok(DocumentAction::Copy),
            "skip" | "s" => Ok(DocumentAction::Skip),
            other => Err(format!("unknown document action `{other}`")),
        }
    }
}

/// Checks that `code` is a well-formed language identifier and returns it trimmed.
pub fn validate_language(code: &str) -> Result<String, Error> {
    let code = code.trim();
    if code.is_empty() || code.parse::<LanguageIdentifier>().is_err() {
        return Err(Error::InvalidLanguage(code.to_string()));
    }
    Ok(code.to_string())
}

/// Sub-directories of `translations_root` that look like a language with at least one
/// dictionary file, sorted by name.
pub fn available_languages<P: AsRef<Path>>(translations_root: P) -> Result<Vec<String>, Error> {
    let root = translations_root.as_ref();
    if !root.is_dir() {
        return Err(Error::ConfigNotFound(root.to_path_buf()));
    }

    let mut languages = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if validate_language(name).is_err() {
            continue;
        }
        let has_dictionary = fs::read_dir(&path)?
            .filter_map(|e| e.ok())
            .any(|e| {
                e.path().is_file()
                    && e.file_name().to_str().is_some_and(is_dictionary_file)
            });
        if has_dictionary {
            languages.push(name.to_string());
        }
    }
    languages.sort();
    Ok(languages)
}

/// Where a language's inputs and outputs live by convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePaths {
    /// `<translations>/<lang>/`
    pub dictionaries: PathBuf,
    /// `<translations>/<lang>/special_cases-<lang>.json`
    pub special_cases: PathBuf,
    /// `<output>/<LANG>/`
    pub output: PathBuf,
}

impl LanguagePaths {
    pub fn conventional(translations_root: &Path, output_root: &Path, language: &str) -> Self {
        let dictionaries = translations_root.join(language);
        LanguagePaths {
            special_cases: dictionaries.join(format!("special_cases-{language}.json")),
            dictionaries,
            output: output_root.join(language.to_uppercase()),
        }
    }
}

/// A language's dictionaries and overlay, loaded once and shared by every document.
#[derive(Debug, Default)]
pub struct LoadedLanguage {
    pub dictionaries: Dictionaries,
    pub special_cases: SpecialCases,
    /// Everything that went wrong while loading; none of it is fatal.
    pub issues: Vec<Error>,
}

impl LoadedLanguage {
    /// Loads the overlay first, since its global terms feed the dictionaries.
    pub fn load(dictionary_dir: &Path, special_cases_path: &Path) -> Self {
        let (special_cases, overlay_issue) = SpecialCases::load_or_default(special_cases_path);
        let (dictionaries, mut issues) = Dictionaries::load(dictionary_dir, &special_cases);
        if let Some(issue) = overlay_issue {
            issues.insert(0, issue);
        }
        LoadedLanguage {
            dictionaries,
            special_cases,
            issues,
        }
    }

    pub fn engine(&self, options: TranslateOptions) -> Engine<'_> {
        Engine::new(&self.dictionaries, &self.special_cases).with_options(options)
    }

    /// Issues worth showing a user: a missing overlay is normal and left out.
    pub fn reportable_issues(&self) -> impl Iterator<Item = &Error> {
        self.special_cases
            .issues()
            .iter()
            .chain(self.issues.iter())
            .filter(|e| !is_missing_overlay(e))
    }
}

fn is_missing_overlay(error: &Error) -> bool {
    match error {
        Error::ConfigNotFound(path) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("special_cases")),
        _ => false,
    }
}

/// Translates one document file and writes the result, creating parent directories.
///
/// `path_key` is the logical path `add_block` targets are matched against.
pub fn translate_file(
    engine: &Engine<'_>,
    input: &Path,
    output: &Path,
    path_key: &str,
) -> Result<TranslatedDocument, Error> {
    let source = read_document(input)?;
    let translated = engine.translate_document(&source, path_key);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &translated.text)?;
    info!("File saved: {}", output.display());
    Ok(translated)
}

/// Options for [`run_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub language: String,
    pub input_dir: PathBuf,
    pub translations_dir: PathBuf,
    pub output_root: PathBuf,
    /// Overrides the conventional `<output_root>/<LANG>/`.
    pub output_dir: Option<PathBuf>,
    /// Per-document actions keyed by manifest path.
    pub actions: BTreeMap<String, DocumentAction>,
    pub default_action: DocumentAction,
    pub manifest_edits: ManifestEdits,
    pub assets: Vec<String>,
    /// Appends the run's untranslated records to this CSV.
    pub missing_report: Option<PathBuf>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            language: String::new(),
            input_dir: PathBuf::from("input"),
            translations_dir: PathBuf::from("translations"),
            output_root: PathBuf::from("output"),
            output_dir: None,
            actions: BTreeMap::new(),
            default_action: DocumentAction::Translate,
            manifest_edits: ManifestEdits::default(),
            assets: DEFAULT_ASSETS.iter().map(|a| a.to_string()).collect(),
            missing_report: None,
        }
    }
}

impl BatchOptions {
    pub fn new(language: impl Into<String>) -> Self {
        BatchOptions {
            language: language.into(),
            ..Default::default()
        }
    }

    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn with_translations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.translations_dir = dir.into();
        self
    }

    pub fn with_output_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_root = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_action(mut self, path: impl Into<String>, action: DocumentAction) -> Self {
        self.actions.insert(path.into(), action);
        self
    }

    pub fn with_default_action(mut self, action: DocumentAction) -> Self {
        self.default_action = action;
        self
    }

    pub fn with_manifest_edits(mut self, edits: ManifestEdits) -> Self {
        self.manifest_edits = edits;
        self
    }

    pub fn with_missing_report(mut self, path: Option<PathBuf>) -> Self {
        self.missing_report = path;
        self
    }

    pub fn action_for(&self, path: &str) -> DocumentAction {
        self.actions
            .get(path)
            .copied()
            .unwrap_or(self.default_action)
    }

    pub fn paths(&self) -> LanguagePaths {
        let mut paths =
            LanguagePaths::conventional(&self.translations_dir, &self.output_root, &self.language);
        if let Some(dir) = &self.output_dir {
            paths.output = dir.clone();
        }
        paths
    }
}

/// Outcome for one document of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub path: String,
    pub action: DocumentAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TranslationStats>,
    pub blocks_applied: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentReport {
    /// Whether the document reached the output directory.
    pub fn is_processed(&self) -> bool {
        self.action != DocumentAction::Skip && self.error.is_none()
    }
}

/// Everything a batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub language: String,
    pub output_dir: PathBuf,
    pub documents: Vec<DocumentReport>,
    pub totals: TranslationStats,
    pub load_issues: Vec<String>,
    pub missing_rows: usize,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.documents.iter().filter(|d| d.is_processed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.documents.len() - self.processed()
    }

    pub fn failed(&self) -> usize {
        self.documents.iter().filter(|d| d.error.is_some()).count()
    }
}

/// Translates, copies or skips every document listed in the input manifest.
///
/// Fails only on setup problems (bad language, missing input directory or manifest).
/// A document that fails is recorded in its report and the batch moves on.
pub fn run_batch(options: &BatchOptions) -> Result<BatchReport, Error> {
    let language = validate_language(&options.language)?;
    let paths = options.paths();
    info!("Translating to: {}", language.to_uppercase());

    if !options.input_dir.is_dir() {
        return Err(Error::ConfigNotFound(options.input_dir.clone()));
    }
    let manifest = Manifest::read_from(options.input_dir.join(MANIFEST_FILE))?;
    let documents = manifest.existing_paths(&options.input_dir);

    let loaded = LoadedLanguage::load(&paths.dictionaries, &paths.special_cases);
    let mut report = BatchReport {
        language: language.clone(),
        output_dir: paths.output.clone(),
        load_issues: loaded.reportable_issues().map(|e| e.to_string()).collect(),
        ..Default::default()
    };

    fs::create_dir_all(&paths.output)?;
    copy_assets(options, &paths.output);

    let total = documents.len();
    for (index, path) in documents.iter().enumerate() {
        let action = options.action_for(path);
        let input = options.input_dir.join(path);
        let output = paths.output.join(path);
        let mut doc = DocumentReport {
            path: path.clone(),
            action,
            ..Default::default()
        };

        match action {
            DocumentAction::Skip => info!("Skipping file: {}", path),
            DocumentAction::Copy => {
                if let Err(e) = copy_file(&input, &output) {
                    error!("Error copying file {}: {}", input.display(), e);
                    doc.error = Some(e.to_string());
                } else {
                    info!("Copied without translation: {} -> {}", input.display(), output.display());
                }
            }
            DocumentAction::Translate => {
                let engine = loaded.engine(
                    TranslateOptions::new()
                        .with_language(&language)
                        .with_label(Some(format!("File {}/{}", index + 1, total))),
                );
                match translate_file(&engine, &input, &output, path) {
                    Ok(translated) => {
                        report.totals.absorb(&translated.stats);
                        doc.blocks_applied = translated.blocks_applied;
                        doc.issues = translated.issues.iter().map(|e| e.to_string()).collect();
                        doc.stats = Some(translated.stats);
                    }
                    Err(e) => {
                        error!("Error processing {}: {}", path, e);
                        doc.error = Some(e.to_string());
                    }
                }
            }
        }
        report.documents.push(doc);
    }

    let skipped: Vec<String> = report
        .documents
        .iter()
        .filter(|d| !d.is_processed())
        .map(|d| d.path.clone())
        .chain(
            manifest
                .paths()
                .iter()
                .filter(|p| !documents.contains(p))
                .cloned(),
        )
        .collect();
    let manifest_out = paths.output.join(MANIFEST_FILE);
    fs::write(&manifest_out, manifest.render(&options.manifest_edits, &skipped))?;
    info!("Updated {} saved to: {}", MANIFEST_FILE, manifest_out.display());

    if let Some(csv_path) = &options.missing_report {
        let rows = MissingTranslation::from_untranslated(&report.totals.untranslated, &language);
        match append_report(csv_path, &rows) {
            Ok(n) => report.missing_rows = n,
            Err(e) => {
                warn!("Could not write missing translations: {}", e);
                report.load_issues.push(e.to_string());
            }
        }
    }

    info!(
        "Total files processed: {}/{}. Files skipped: {}",
        report.processed(),
        total,
        report.skipped()
    );
    Ok(report)
}

fn copy_file(input: &Path, output: &Path) -> Result<(), Error> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(input, output)?;
    Ok(())
}

fn copy_assets(options: &BatchOptions, output_dir: &Path) {
    for asset in &options.assets {
        let source = options.input_dir.join(asset);
        if !source.is_file() {
            warn!("{} not found in {}", asset, options.input_dir.display());
            continue;
        }
        match copy_file(&source, &output_dir.join(asset)) {
            Ok(()) => info!("Copied {} to: {}", asset, output_dir.display()),
            Err(e) => error!("Error copying {}: {}", asset, e),
        }
    }
}
