//! Category term dictionaries and the longest-first term index built from them.
//!
//! Dictionaries are assembled with a [`DictionaryBuilder`] and frozen into
//! [`Dictionaries`]; the term index is compiled at freeze time, so the engine never
//! sees an index that disagrees with the tables.

use std::{
    collections::{HashMap, HashSet},
    fs,
    io::BufRead,
    path::Path,
};

use log::{info, warn};
use regex::Regex;
use serde::Serialize;

use crate::{
    error::Error,
    special_cases::SpecialCases,
    traits::Source,
    types::{Category, TermList, ordered_terms},
};

/// Characters that suppress the word-boundary assertion on the side of a term they sit on.
const BOUNDARY_PUNCTUATION: &[char] = &['.', '!', '?', ',', ':', ';'];

/// Contents of one dictionary file: English term to translated term, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermFile {
    pub terms: TermList,
}

impl Source for TermFile {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut deserializer = serde_json::Deserializer::from_reader(reader);
        let terms = ordered_terms(&mut deserializer)?;
        deserializer.end()?;
        Ok(TermFile { terms })
    }
}

/// Whether `file_name` is a dictionary file (as opposed to the overlay or anything else).
pub fn is_dictionary_file(file_name: &str) -> bool {
    file_name.ends_with(".json") && !file_name.starts_with("special_cases")
}

#[derive(Debug, Clone, Default)]
struct Tables {
    generic: HashMap<String, String>,
    type_: HashMap<String, String>,
    move_: HashMap<String, String>,
    ability: HashMap<String, String>,
    item: HashMap<String, String>,
}

impl Tables {
    fn get(&self, category: Category) -> &HashMap<String, String> {
        match category {
            Category::Generic => &self.generic,
            Category::Type => &self.type_,
            Category::Move => &self.move_,
            Category::Ability => &self.ability,
            Category::Item => &self.item,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut HashMap<String, String> {
        match category {
            Category::Generic => &mut self.generic,
            Category::Type => &mut self.type_,
            Category::Move => &mut self.move_,
            Category::Ability => &mut self.ability,
            Category::Item => &mut self.item,
        }
    }
}

/// Mutable staging area for dictionaries.
#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    tables: Tables,
    discovery: Vec<String>,
    seen: HashSet<String>,
    issues: Vec<Error>,
}

impl DictionaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one term; an existing key in the same category is overwritten.
    pub fn insert(
        &mut self,
        category: Category,
        term: impl Into<String>,
        translation: impl Into<String>,
    ) -> &mut Self {
        let term = term.into();
        if self.seen.insert(term.clone()) {
            self.discovery.push(term.clone());
        }
        self.tables.get_mut(category).insert(term, translation.into());
        self
    }

    pub fn extend<I, K, V>(&mut self, category: Category, terms: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (term, translation) in terms {
            self.insert(category, term, translation);
        }
        self
    }

    /// Loads every dictionary file directly inside `dir`, in file-name order.
    ///
    /// A file that cannot be read or parsed is logged, kept in [`Self::issues`] and
    /// skipped; the rest still load. A missing directory is [`Error::ConfigNotFound`].
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<&mut Self, Error> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::ConfigNotFound(dir.to_path_buf()));
        }

        let mut files: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(is_dictionary_file)
            })
            .collect();
        files.sort();

        for path in files {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let category = Category::from_file_name(&file_name);
            match TermFile::read_from(&path) {
                Ok(file) => {
                    info!(
                        "Loaded {} file: {} ({} translations)",
                        category,
                        file_name,
                        file.terms.len()
                    );
                    self.extend(category, file.terms);
                }
                Err(e) => {
                    warn!("Error loading {}: {}", file_name, e);
                    self.issues.push(e);
                }
            }
        }
        Ok(self)
    }

    /// Merges the overlay's global `add_translation` terms into the generic table.
    pub fn merge_global_terms(&mut self, cases: &SpecialCases) -> &mut Self {
        let terms = cases.global_terms();
        if !terms.is_empty() {
            info!("Added {} global translations to generic dictionary", terms.len());
            self.extend(
                Category::Generic,
                terms.iter().map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        self
    }

    /// Files that failed to load so far.
    pub fn issues(&self) -> &[Error] {
        &self.issues
    }

    /// Freezes the tables and compiles the term index.
    pub fn build(self) -> Dictionaries {
        let index = TermIndex::build(&self.discovery);
        Dictionaries {
            tables: self.tables,
            discovery: self.discovery,
            index,
        }
    }

    /// Like [`Self::build`], also handing back the load issues.
    pub fn finish(self) -> (Dictionaries, Vec<Error>) {
        let DictionaryBuilder {
            tables,
            discovery,
            issues,
            ..
        } = self;
        let index = TermIndex::build(&discovery);
        (
            Dictionaries {
                tables,
                discovery,
                index,
            },
            issues,
        )
    }
}

/// Per-category sizes, used for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DictionarySummary {
    pub generic: usize,
    #[serde(rename = "type")]
    pub type_: usize,
    #[serde(rename = "move")]
    pub move_: usize,
    pub ability: usize,
    pub item: usize,
    pub distinct_terms: usize,
}

/// Frozen category dictionaries plus their term index.
#[derive(Debug, Clone)]
pub struct Dictionaries {
    tables: Tables,
    discovery: Vec<String>,
    index: TermIndex,
}

impl Default for Dictionaries {
    fn default() -> Self {
        DictionaryBuilder::new().build()
    }
}

impl Dictionaries {
    /// Loads `dir` and merges the overlay's global terms (which win over file entries).
    ///
    /// Never fails: an absent directory yields empty dictionaries and every problem is
    /// returned alongside for reporting.
    pub fn load<P: AsRef<Path>>(dir: P, cases: &SpecialCases) -> (Dictionaries, Vec<Error>) {
        let mut builder = DictionaryBuilder::new();
        let mut issues = Vec::new();
        if let Err(e) = builder.load_dir(dir) {
            warn!("{}", e);
            issues.push(e);
        }
        builder.merge_global_terms(cases);
        let (dictionaries, mut load_issues) = builder.finish();
        issues.append(&mut load_issues);

        let summary = dictionaries.summary();
        info!(
            "Loaded {} translations (context-specific: {})",
            summary.generic + summary.type_ + summary.move_ + summary.ability + summary.item,
            summary.type_ + summary.move_ + summary.ability + summary.item
        );
        (dictionaries, issues)
    }

    /// Exact, case-sensitive lookup in one category.
    pub fn get(&self, category: Category, term: &str) -> Option<&str> {
        self.tables.get(category).get(term).map(String::as_str)
    }

    pub fn len(&self, category: Category) -> usize {
        self.tables.get(category).len()
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.len(*c) == 0)
    }

    pub fn term_index(&self) -> &TermIndex {
        &self.index
    }

    pub fn summary(&self) -> DictionarySummary {
        DictionarySummary {
            generic: self.len(Category::Generic),
            type_: self.len(Category::Type),
            move_: self.len(Category::Move),
            ability: self.len(Category::Ability),
            item: self.len(Category::Item),
            distinct_terms: self.discovery.len(),
        }
    }
}

/// A dictionary term with its compiled match pattern.
#[derive(Debug, Clone)]
pub struct TermPattern {
    pub term: String,
    pub regex: Regex,
}

/// Every distinct term across all categories, longest first.
///
/// Ties keep discovery order so the outcome is deterministic.
#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    entries: Vec<TermPattern>,
}

impl TermIndex {
    fn build(discovery: &[String]) -> TermIndex {
        let mut terms: Vec<&String> = discovery.iter().filter(|t| !t.is_empty()).collect();
        // stable sort keeps discovery order among equal lengths
        terms.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));

        let entries = terms
            .into_iter()
            .filter_map(|term| match term_pattern(term) {
                Ok(regex) => Some(TermPattern {
                    term: term.clone(),
                    regex,
                }),
                Err(e) => {
                    warn!("Cannot compile pattern for term `{}`: {}", term, e);
                    None
                }
            })
            .collect();
        TermIndex { entries }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TermPattern> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case-insensitive pattern for `term`, with word boundaries except on a side that
/// starts or ends with sentence punctuation.
pub fn term_pattern(term: &str) -> Result<Regex, regex::Error> {
    let leading = if term.starts_with(BOUNDARY_PUNCTUATION) {
        ""
    } else {
        r"\b"
    };
    let trailing = if term.ends_with(BOUNDARY_PUNCTUATION) {
        ""
    } else {
        r"\b"
    };
    Regex::new(&format!("(?i){}{}{}", leading, regex::escape(term), trailing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_last_write_wins() {
        let mut builder = DictionaryBuilder::new();
        builder
            .insert(Category::Type, "Fire", "Fuoco")
            .insert(Category::Type, "Fire", "Fiamma")
            .insert(Category::Move, "Fire", "Fuocobomba");
        let dicts = builder.build();
        assert_eq!(dicts.get(Category::Type, "Fire"), Some("Fiamma"));
        assert_eq!(dicts.get(Category::Move, "Fire"), Some("Fuocobomba"));
        assert_eq!(dicts.get(Category::Type, "fire"), None);
        assert_eq!(dicts.term_index().len(), 1);
    }

    #[test]
    fn test_index_longest_first_with_stable_ties() {
        let mut builder = DictionaryBuilder::new();
        builder
            .insert(Category::Generic, "Ball", "Ball")
            .insert(Category::Item, "Poke Ball", "Poké Ball")
            .insert(Category::Type, "Rock", "Roccia")
            .insert(Category::Move, "Rock Slide", "Frana");
        let dicts = builder.build();
        let order: Vec<_> = dicts.term_index().iter().map(|t| t.term.as_str()).collect();
        assert_eq!(order, vec!["Rock Slide", "Poke Ball", "Ball", "Rock"]);
    }

    #[test]
    fn test_term_pattern_boundaries() {
        let plain = term_pattern("Fire").unwrap();
        assert!(plain.is_match("a fire type"));
        assert!(!plain.is_match("Firework"));

        let trailing = term_pattern("It's super effective!").unwrap();
        assert!(trailing.is_match("It's super effective!!"));

        let leading = term_pattern("...and more").unwrap();
        assert!(leading.is_match("wait...and more"));
    }


    #[test]
    fn test_is_dictionary_file() {
        assert!(is_dictionary_file("type-it.json"));
        assert!(!is_dictionary_file("special_cases-it.json"));
        assert!(!is_dictionary_file("notes.txt"));
    }

    #[test]
    fn test_term_file_rejects_non_strings() {
        assert!(TermFile::from_str(r#"{"Fire": 1}"#).is_err());
        let file = TermFile::from_str(r#"{"Fire": "Fuoco"}"#).unwrap();
        assert_eq!(file.terms, vec![("Fire".to_string(), "Fuoco".to_string())]);
    }

    #[test]
    fn test_equal_length_terms_keep_file_order() {
        let file = TermFile::from_str(r#"{ "Zap": "Zac", "Ace": "Asso", "Bolt": "Fulmine" }"#).unwrap();
        let mut builder = DictionaryBuilder::new();
        builder.extend(Category::Generic, file.terms);
        let dicts = builder.build();
        let order: Vec<_> = dicts.term_index().iter().map(|t| t.term.as_str()).collect();
        assert_eq!(order, vec!["Bolt", "Zap", "Ace"]);
    }
}
