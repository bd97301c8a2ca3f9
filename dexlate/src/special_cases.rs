//! The special-cases overlay: per-record corrections that win over the dictionaries.
//!
//! The overlay file is a JSON object. Five top-level keys are recognized
//! (`override_translation`, `no_translation`, `transform_translation`,
//! `add_translation`, `add_block`); every other key is a legacy per-id entry with a
//! `type` field. Any id written as `<int>-<int>` is expanded to one entry per integer.

use std::{
    collections::{HashMap, HashSet},
    io::BufRead,
    path::Path,
};

use log::{debug, error, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::Error,
    ids::IdSpec,
    traits::Source,
    types::{TermList, ordered_terms},
};

const OVERRIDE_KEY: &str = "override_translation";
const NO_TRANSLATION_KEY: &str = "no_translation";
const TRANSFORM_KEY: &str = "transform_translation";
const ADD_TRANSLATION_KEY: &str = "add_translation";
const ADD_BLOCK_KEY: &str = "add_block";

/// Forces the output text verbatim, even when empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub translation: String,
    pub reason: Option<String>,
}

/// One regex/template pair of a transform.
#[derive(Debug, Clone)]
pub struct TransformPattern {
    pub regex: Regex,
    pub template: String,
    pub description: Option<String>,
}

/// Ordered patterns tried against a record's raw text; the first match wins.
#[derive(Debug, Clone)]
pub struct Transform {
    pub patterns: Vec<TransformPattern>,
    pub reason: Option<String>,
}

/// Literal markup inserted into an output document after translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddBlock {
    pub target_path: String,
    pub content: String,
    pub reason: Option<String>,
}

impl AddBlock {
    /// Whether this block belongs in the document at `path`.
    ///
    /// Both sides are separator-normalized. Either may be the longer one, as long as
    /// the shorter ends the longer on a component boundary: `foo.xml` matches
    /// `input/foo.xml`, and a target of `input/strings/foo.xml` matches the
    /// manifest-relative `strings/foo.xml`.
    pub fn targets(&self, path: &str) -> bool {
        let target = normalize_path(&self.target_path);
        let path = normalize_path(path);
        is_component_suffix(&path, &target) || is_component_suffix(&target, &path)
    }
}

fn is_component_suffix(long: &str, short: &str) -> bool {
    !short.is_empty()
        && long
            .strip_suffix(short)
            .is_some_and(|rest| rest.is_empty() || rest.ends_with('/'))
}

/// Normalizes a document path for comparison: `\` becomes `/`, a leading `./` is dropped.
pub fn normalize_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .map(str::to_string)
        .unwrap_or(normalized)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyKind {
    NoTranslation,
    AddTranslation,
    /// Any other `type`; kept so it shows up in summaries, but never fires.
    Other(String),
}

/// A top-level per-id entry from older overlay files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCase {
    pub kind: LegacyKind,
    pub reason: Option<String>,
    /// Record-scoped terms for `add_translation` entries, applied in file order.
    pub translations: TermList,
}

/// Entry counts per mechanism, used for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpecialCasesSummary {
    pub overrides: usize,
    pub no_translation: usize,
    pub transforms: usize,
    pub global_terms: usize,
    pub add_blocks: usize,
    pub legacy: usize,
}

/// The loaded, range-expanded overlay.
#[derive(Debug, Default)]
pub struct SpecialCases {
    overrides: HashMap<String, Override>,
    no_translation: HashSet<String>,
    transforms: HashMap<String, Transform>,
    global_terms: TermList,
    add_blocks: Vec<AddBlock>,
    legacy: HashMap<String, LegacyCase>,
    issues: Vec<Error>,
}

#[derive(Deserialize)]
struct RawIds<T> {
    #[serde(default = "Vec::new")]
    ids: Vec<T>,
}

#[derive(Deserialize)]
struct RawOverride {
    #[serde(default)]
    id: String,
    #[serde(default)]
    translation: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RawNoTranslation {
    #[serde(default)]
    id: String,
    #[serde(default, alias = "reason")]
    comment: Option<String>,
}

#[derive(Deserialize)]
struct RawTransform {
    #[serde(default)]
    id: String,
    #[serde(default)]
    patterns: Vec<RawPattern>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RawPattern {
    #[serde(default)]
    regex: Option<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawAddTranslation {
    #[serde(default, deserialize_with = "ordered_terms")]
    translations: TermList,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBlocks {
    Many(Vec<RawBlock>),
    One(RawBlock),
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(default)]
    content: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RawLegacy {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default, deserialize_with = "ordered_terms")]
    translations: TermList,
}

impl Source for SpecialCases {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let document: Map<String, Value> = serde_json::from_reader(reader)?;
        SpecialCases::from_document(document)
    }
}

impl SpecialCases {
    /// Creates an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the overlay at `path`, degrading to an empty overlay on failure.
    ///
    /// A missing file is not worth more than a debug line. Unreadable or malformed
    /// files are logged and the failure is handed back so callers can report it.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<Error>) {
        let path = path.as_ref();
        match SpecialCases::read_from(path) {
            Ok(cases) => {
                info!(
                    "Loaded special cases from {}: {:?}",
                    path.display(),
                    cases.summary()
                );
                (cases, None)
            }
            Err(Error::ConfigNotFound(p)) => {
                debug!("No special cases at {}", p.display());
                (SpecialCases::default(), Some(Error::ConfigNotFound(p)))
            }
            Err(e) => {
                error!("Error loading special cases: {}", e);
                (SpecialCases::default(), Some(e))
            }
        }
    }

    fn from_document(mut document: Map<String, Value>) -> Result<Self, Error> {
        let mut cases = SpecialCases::default();

        if let Some(section) = document.remove(ADD_TRANSLATION_KEY) {
            let raw: RawAddTranslation = serde_json::from_value(section)?;
            info!("Loaded {} additional global translations", raw.translations.len());
            cases.global_terms = raw.translations;
        }

        if let Some(section) = document.remove(ADD_BLOCK_KEY) {
            let raw: Map<String, Value> = serde_json::from_value(section)?;
            for (target_path, blocks) in raw {
                let blocks = match serde_json::from_value::<RawBlocks>(blocks)? {
                    RawBlocks::One(block) => vec![block],
                    RawBlocks::Many(blocks) => blocks,
                };
                for block in blocks {
                    cases.add_blocks.push(AddBlock {
                        target_path: target_path.clone(),
                        content: block.content,
                        reason: block.reason,
                    });
                }
            }
            info!(
                "Detected {} blocks to add (application deferred)",
                cases.add_blocks.len()
            );
        }

        if let Some(section) = document.remove(OVERRIDE_KEY) {
            let raw: RawIds<RawOverride> = serde_json::from_value(section)?;
            for entry in raw.ids {
                let value = Override {
                    translation: entry.translation,
                    reason: entry.reason,
                };
                cases.expand_into(OVERRIDE_KEY, &entry.id, |cases, id| {
                    cases.overrides.insert(id, value.clone());
                });
            }
            info!("Loaded {} IDs for override_translation", cases.overrides.len());
        }

        if let Some(section) = document.remove(TRANSFORM_KEY) {
            let raw: RawIds<RawTransform> = serde_json::from_value(section)?;
            for entry in raw.ids {
                let transform = Transform {
                    patterns: compile_patterns(&entry.id, entry.patterns, &mut cases.issues),
                    reason: entry.reason,
                };
                cases.expand_into(TRANSFORM_KEY, &entry.id, |cases, id| {
                    cases.transforms.insert(id, transform.clone());
                });
            }
            info!("Loaded {} IDs for transform_translation", cases.transforms.len());
        }

        if let Some(section) = document.remove(NO_TRANSLATION_KEY) {
            let raw: RawIds<RawNoTranslation> = serde_json::from_value(section)?;
            for entry in raw.ids {
                if let Some(comment) = &entry.comment {
                    debug!("no_translation {} ({})", entry.id, comment);
                }
                cases.expand_into(NO_TRANSLATION_KEY, &entry.id, |cases, id| {
                    cases.no_translation.insert(id);
                });
            }
            info!("Loaded {} IDs for no_translation", cases.no_translation.len());
        }

        for (key, value) in document {
            let raw: RawLegacy = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Ignoring special case `{}`: {}", key, e);
                    continue;
                }
            };
            let kind = match raw.kind.as_deref() {
                Some("no_translation") => LegacyKind::NoTranslation,
                Some("add_translation") => LegacyKind::AddTranslation,
                other => LegacyKind::Other(other.unwrap_or_default().to_string()),
            };
            let case = LegacyCase {
                kind,
                reason: raw.reason.or(raw.comment),
                translations: raw.translations,
            };
            cases.expand_into("special case", &key, |cases, id| {
                cases.legacy.insert(id, case.clone());
            });
        }
        info!("Loaded {} legacy special cases", cases.legacy.len());

        Ok(cases)
    }

    /// Runs `insert` for every id `raw` expands to; malformed ranges are logged and skipped.
    fn expand_into<F>(&mut self, section: &str, raw: &str, mut insert: F)
    where
        F: FnMut(&mut SpecialCases, String),
    {
        if raw.is_empty() {
            warn!("Ignoring {} entry without an id", section);
            return;
        }
        match IdSpec::parse(raw) {
            Ok(spec) => {
                if spec.is_range() {
                    debug!("Expanded {} range {} into {} IDs", section, raw, spec.len());
                }
                for id in spec.ids() {
                    insert(self, id);
                }
            }
            Err(e) => {
                warn!("Error parsing {} range: {}", section, raw);
                self.issues.push(e);
            }
        }
    }

    pub fn override_for(&self, id: &str) -> Option<&Override> {
        self.overrides.get(id)
    }

    pub fn is_no_translation(&self, id: &str) -> bool {
        self.no_translation.contains(id)
    }

    pub fn transform_for(&self, id: &str) -> Option<&Transform> {
        self.transforms.get(id)
    }

    pub fn legacy_for(&self, id: &str) -> Option<&LegacyCase> {
        self.legacy.get(id)
    }

    /// Record-scoped terms from a legacy `add_translation` entry, if any.
    pub fn record_terms(&self, id: &str) -> Option<&[(String, String)]> {
        self.legacy_for(id)
            .filter(|case| case.kind == LegacyKind::AddTranslation)
            .map(|case| case.translations.as_slice())
    }

    /// Terms merged into the generic dictionary before processing.
    pub fn global_terms(&self) -> &[(String, String)] {
        &self.global_terms
    }

    /// Blocks destined for the document at `path`, in overlay order.
    pub fn blocks_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a AddBlock> + 'a {
        self.add_blocks.iter().filter(move |block| block.targets(path))
    }

    /// Recoverable problems found while loading (malformed ranges, bad patterns).
    pub fn issues(&self) -> &[Error] {
        &self.issues
    }

    pub fn summary(&self) -> SpecialCasesSummary {
        SpecialCasesSummary {
            overrides: self.overrides.len(),
            no_translation: self.no_translation.len(),
            transforms: self.transforms.len(),
            global_terms: self.global_terms.len(),
            add_blocks: self.add_blocks.len(),
            legacy: self.legacy.len(),
        }
    }
}

fn compile_patterns(id: &str, raw: Vec<RawPattern>, issues: &mut Vec<Error>) -> Vec<TransformPattern> {
    raw.into_iter()
        .filter_map(|pattern| {
            let (Some(source), Some(template)) = (pattern.regex, pattern.template) else {
                debug!("Skipping incomplete transform pattern for {}", id);
                return None;
            };
            match Regex::new(&source) {
                Ok(regex) => Some(TransformPattern {
                    regex,
                    template,
                    description: pattern.description,
                }),
                Err(source_err) => {
                    let err = Error::InvalidPattern {
                        id: id.to_string(),
                        pattern: source,
                        source: source_err,
                    };
                    warn!("{}", err);
                    issues.push(err);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::find_term;

    const OVERLAY: &str = r#"{
        "add_translation": { "translations": { "Poke Ball": "Poké Ball" } },
        "add_block": {
            "input/foo.xml": { "content": "<string id=\"99\">X</string>", "reason": "missing line" }
        },
        "override_translation": {
            "ids": [
                { "id": "5", "translation": "", "reason": "blank on purpose" },
                { "id": "100-102", "translation": "Fisso" }
            ]
        },
        "transform_translation": {
            "ids": [
                { "id": "20", "patterns": [ { "regex": "^Lv\\.(\\d+)$", "template": "Liv.{group1}" } ] }
            ]
        },
        "no_translation": { "ids": [ { "id": "10-12", "comment": "proper noun" } ] },
        "7": { "type": "no_translation", "reason": "credits" },
        "30-31": { "type": "add_translation", "translations": { "Rock": "Roccia" } }
    }"#;

    #[test]
    fn test_parse_full_overlay() {
        let cases = SpecialCases::from_str(OVERLAY).unwrap();
        let summary = cases.summary();
        assert_eq!(summary.overrides, 4);
        assert_eq!(summary.no_translation, 3);
        assert_eq!(summary.transforms, 1);
        assert_eq!(summary.global_terms, 1);
        assert_eq!(summary.add_blocks, 1);
        assert_eq!(summary.legacy, 3);
        assert!(cases.issues().is_empty());

        assert_eq!(cases.override_for("5").unwrap().translation, "");
        assert_eq!(cases.override_for("101").unwrap().translation, "Fisso");
        assert!(cases.is_no_translation("11"));
        assert!(!cases.is_no_translation("13"));
        assert_eq!(cases.transform_for("20").unwrap().patterns.len(), 1);
        assert_eq!(cases.legacy_for("7").unwrap().kind, LegacyKind::NoTranslation);
        assert_eq!(find_term(cases.record_terms("31").unwrap(), "Rock"), Some("Roccia"));
        assert!(cases.record_terms("7").is_none());
    }

    #[test]
    fn test_malformed_range_is_skipped() {
        let json = r#"{ "no_translation": { "ids": [ { "id": "1.5-3" }, { "id": "4" } ] } }"#;
        let cases = SpecialCases::from_str(json).unwrap();
        assert_eq!(cases.summary().no_translation, 1);
        assert_eq!(cases.issues().len(), 1);
        assert!(matches!(cases.issues()[0], Error::MalformedRange(_)));
    }

    #[test]
    fn test_invalid_transform_regex_is_dropped() {
        let json = r#"{ "transform_translation": { "ids": [
            { "id": "1", "patterns": [ { "regex": "(", "template": "x" }, { "regex": "a", "template": "b" } ] }
        ] } }"#;
        let cases = SpecialCases::from_str(json).unwrap();
        assert_eq!(cases.transform_for("1").unwrap().patterns.len(), 1);
        assert!(matches!(cases.issues()[0], Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_malformed_json_fails_whole_file() {
        assert!(matches!(
            SpecialCases::from_str("{ not json"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_add_block_list_form_keeps_order() {
        let json = r#"{ "add_block": { "foo.xml": [
            { "content": "<a/>" }, { "content": "<b/>" }
        ] } }"#;
        let cases = SpecialCases::from_str(json).unwrap();
        let contents: Vec<_> = cases
            .blocks_for("foo.xml")
            .map(|b| b.content.as_str())
            .collect();
        assert_eq!(contents, vec!["<a/>", "<b/>"]);
    }

    #[test]
    fn test_block_target_matching() {
        let block = AddBlock {
            target_path: "strings\\foo.xml".to_string(),
            content: String::new(),
            reason: None,
        };
        assert!(block.targets("strings/foo.xml"));
        assert!(block.targets("./strings/foo.xml"));
        assert!(block.targets("input/strings/foo.xml"));
        assert!(!block.targets("strings/barfoo.xml"));
        assert!(!block.targets("strings/foo.xml.bak"));

        let full = AddBlock {
            target_path: "input/strings/foo.xml".to_string(),
            content: String::new(),
            reason: None,
        };
        assert!(full.targets("strings/foo.xml"));
        assert!(full.targets("foo.xml"));
        assert!(!full.targets("other/foo.xml"));
        assert!(!full.targets("oo.xml"));
    }

    #[test]
    fn test_add_block_targets_keep_file_order() {
        let json = r#"{ "add_block": {
            "z.xml": { "content": "<z/>" },
            "a.xml": { "content": "<a/>" }
        } }"#;
        let cases = SpecialCases::from_str(json).unwrap();
        let targets: Vec<_> = cases.add_blocks.iter().map(|b| b.target_path.as_str()).collect();
        assert_eq!(targets, vec!["z.xml", "a.xml"]);
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let (cases, issue) = SpecialCases::load_or_default("/definitely/not/here.json");
        assert_eq!(cases.summary(), SpecialCasesSummary::default());
        assert!(matches!(issue, Some(Error::ConfigNotFound(_))));
    }
}
