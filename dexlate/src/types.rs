//! Core types shared by the loaders, the engine and the reporters.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};

use crate::error::Error;

/// English term to translated term, in the order the source file lists them.
pub type TermList = Vec<(String, String)>;

/// Reads a JSON object of strings without losing its key order.
pub(crate) fn ordered_terms<'de, D>(deserializer: D) -> Result<TermList, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Map::<String, Value>::deserialize(deserializer)?;
    map.into_iter()
        .map(|(term, value)| match value {
            Value::String(translation) => Ok((term, translation)),
            other => Err(D::Error::custom(format!(
                "expected a string translation for `{term}`, found {other}"
            ))),
        })
        .collect()
}

/// Exact lookup in a [`TermList`].
pub fn find_term<'a>(terms: &'a [(String, String)], term: &str) -> Option<&'a str> {
    terms
        .iter()
        .find(|(english, _)| english == term)
        .map(|(_, translation)| translation.as_str())
}

/// One localizable unit: `<string id="ID">TEXT</string>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StringRecord {
    pub id: String,
    pub text: String,
}

impl StringRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        StringRecord {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl Display for StringRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringRecord {{ id: {}, text: {} }}", self.id, self.text)
    }
}

/// Semantic domain of a term dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Generic,
    Type,
    Move,
    Ability,
    Item,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Generic,
        Category::Type,
        Category::Move,
        Category::Ability,
        Category::Item,
    ];

    /// Picks the category of a dictionary file from its name prefix.
    ///
    /// ```rust
    /// use dexlate::Category;
    /// assert_eq!(Category::from_file_name("type-it.json"), Category::Type);
    /// assert_eq!(Category::from_file_name("berry-it.json"), Category::Generic);
    /// ```
    pub fn from_file_name(name: &str) -> Category {
        if name.starts_with("type-") {
            Category::Type
        } else if name.starts_with("move-") {
            Category::Move
        } else if name.starts_with("ability-") {
            Category::Ability
        } else if name.starts_with("item-") {
            Category::Item
        } else {
            Category::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Generic => "generic",
            Category::Type => "type",
            Category::Move => "move",
            Category::Ability => "ability",
            Category::Item => "item",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(Category::Generic),
            "type" => Ok(Category::Type),
            "move" => Ok(Category::Move),
            "ability" => Ok(Category::Ability),
            "item" => Ok(Category::Item),
            other => Err(Error::InvalidManifest(format!("unknown category `{other}`"))),
        }
    }
}

/// Which mechanism settled a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Override,
    NoTranslation,
    Transform,
    LegacyNoTranslation,
    LegacyAddTranslation,
    Dictionary,
    Untranslated,
}

impl DecisionKind {
    /// Log tag for this decision.
    pub fn tag(&self) -> &'static str {
        match self {
            DecisionKind::Override => "GLOBAL_OVERRIDE",
            DecisionKind::NoTranslation => "NO_TRANSLATION",
            DecisionKind::Transform => "GLOBAL_TRANSFORM",
            DecisionKind::LegacyNoTranslation => "SKIP",
            DecisionKind::LegacyAddTranslation => "ADD_TRANS",
            DecisionKind::Dictionary => "DICT",
            DecisionKind::Untranslated => "NO TRANSLATION",
        }
    }

    pub fn is_special_case(&self) -> bool {
        !matches!(self, DecisionKind::Dictionary | DecisionKind::Untranslated)
    }
}

/// Terminal state of the per-record cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    /// Leave the record exactly as it was in the source document.
    Original,
    /// Replace the record text.
    Translated(String),
}

/// The outcome of running one record through the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub kind: DecisionKind,
    pub emit: Emit,
    /// Free-form explanation taken from the special case, if any.
    pub reason: Option<String>,
}

impl Decision {
    pub fn original(kind: DecisionKind, reason: Option<String>) -> Self {
        Decision {
            kind,
            emit: Emit::Original,
            reason,
        }
    }

    pub fn translated(kind: DecisionKind, text: String, reason: Option<String>) -> Self {
        Decision {
            kind,
            emit: Emit::Translated(text),
            reason,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self.emit, Emit::Translated(_))
    }
}

/// Per-document counters. Observational only; never used for control flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranslationStats {
    pub total: usize,
    pub translated: usize,
    pub not_translated: usize,
    pub special_cases_applied: usize,
    /// Records the default path could not translate, in document order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub untranslated: Vec<StringRecord>,
}

impl TranslationStats {
    pub(crate) fn record(&mut self, record: &StringRecord, decision: &Decision) {
        if decision.kind.is_special_case() {
            self.special_cases_applied += 1;
        }
        if decision.is_translated() {
            self.translated += 1;
        } else {
            self.not_translated += 1;
        }
        if decision.kind == DecisionKind::Untranslated {
            self.untranslated.push(record.clone());
        }
    }

    /// Adds another document's counters into this one.
    pub fn absorb(&mut self, other: &TranslationStats) {
        self.total += other.total;
        self.translated += other.translated;
        self.not_translated += other.not_translated;
        self.special_cases_applied += other.special_cases_applied;
        self.untranslated.extend(other.untranslated.iter().cloned());
    }
}

impl Display for TranslationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Translated elements: {}/{}. Non-translated elements: {}/{}. Special cases applied: {}",
            self.translated, self.total, self.not_translated, self.total, self.special_cases_applied
        )
    }
}
