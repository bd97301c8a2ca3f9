#![forbid(unsafe_code)]
//! Dictionary-driven translation of game mod string resources.
//!
//! A mod ships flat `<string id="…">TEXT</string>` documents. `dexlate` rewrites the
//! `TEXT` of each record using per-category term dictionaries (type, move, ability,
//! item, generic), picked by context, and a special-cases overlay whose per-id entries
//! always win over the dictionaries. Every byte outside a rewritten record is kept.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use dexlate::{LoadedLanguage, TranslateOptions};
//!
//! let loaded = LoadedLanguage::load(
//!     Path::new("translations/it"),
//!     Path::new("translations/it/special_cases-it.json"),
//! );
//! let engine = loaded.engine(TranslateOptions::new().with_language("it"));
//! let out = engine.translate_document(r#"<string id="5">This move is Fire type.</string>"#, "moves.xml");
//! println!("{}\n{}", out.text, out.stats);
//! ```
//!
//! # Per-record cascade
//!
//! 1. `override_translation`
//! 2. `no_translation`
//! 3. `transform_translation`
//! 4. legacy per-id entries
//! 5. dictionaries: whole text first, then longest-first partial substitution
//!
//! Dictionary and transform results then get their parenthesized type names translated,
//! and `add_block` content is inserted into the finished document.

pub mod batch;
pub mod blocks;
pub mod cascade;
pub mod dictionary;
pub mod document;
pub mod engine;
pub mod error;
pub mod ids;
pub mod manifest;
pub mod missing;
pub mod resolver;
pub mod special_cases;
pub mod template;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    batch::{
        BatchOptions, BatchReport, DocumentAction, DocumentReport, LanguagePaths,
        LoadedLanguage, available_languages, run_batch, translate_file, validate_language,
    },
    dictionary::{Dictionaries, DictionaryBuilder, DictionarySummary},
    engine::{Engine, TranslateOptions, TranslatedDocument},
    error::Error,
    manifest::{Manifest, ManifestEdits},
    missing::MissingTranslation,
    resolver::ContextResolver,
    special_cases::{SpecialCases, SpecialCasesSummary},
    traits::Source,
    types::{Category, Decision, DecisionKind, Emit, StringRecord, TranslationStats},
};
