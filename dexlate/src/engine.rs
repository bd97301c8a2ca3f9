//! The translation engine: runs every record of a document through the cascade,
//! reassembles the document, then applies deferred blocks.

use log::{debug, info};

use crate::{
    blocks::apply_blocks,
    cascade::{self, CascadeStep, RecordContext},
    dictionary::Dictionaries,
    document::{self, RecordSpan},
    error::Error,
    resolver::ContextResolver,
    special_cases::SpecialCases,
    types::{Decision, DecisionKind, Emit, StringRecord, TranslationStats},
};

/// Options for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranslateOptions {
    /// Target language code, used for log lines only.
    pub language: String,
    /// Prefix for per-record log lines (e.g. `File 2/5`).
    pub label: Option<String>,
}

impl TranslateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }
}

/// Mutable state threaded through one document run.
#[derive(Debug, Default)]
pub struct RunState {
    pub stats: TranslationStats,
    pub issues: Vec<Error>,
    position: usize,
}

impl RunState {
    pub fn new(total: usize) -> Self {
        RunState {
            stats: TranslationStats {
                total,
                ..Default::default()
            },
            issues: Vec::new(),
            position: 0,
        }
    }
}

/// A rewritten document with its counters.
#[derive(Debug, Default)]
pub struct TranslatedDocument {
    pub text: String,
    pub stats: TranslationStats,
    pub blocks_applied: usize,
    /// Recoverable problems met while producing this document.
    pub issues: Vec<Error>,
}

/// Applies dictionaries and special cases to documents.
///
/// Borrowed inputs are read-only for the engine's lifetime.
pub struct Engine<'a> {
    dictionaries: &'a Dictionaries,
    special_cases: &'a SpecialCases,
    steps: Vec<Box<dyn CascadeStep>>,
    options: TranslateOptions,
}

impl<'a> Engine<'a> {
    pub fn new(dictionaries: &'a Dictionaries, special_cases: &'a SpecialCases) -> Self {
        Engine {
            dictionaries,
            special_cases,
            steps: cascade::default_steps(),
            options: TranslateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn resolver(&self) -> ContextResolver<'a> {
        ContextResolver::new(self.dictionaries)
    }

    /// Decides one record: cascade, then the parenthesis pass on dictionary and
    /// transform results.
    ///
    /// Recoverable problems are only logged; see [`Self::decide_collecting`].
    pub fn decide(&self, record: &StringRecord) -> Decision {
        self.decide_collecting(record, &mut Vec::new())
    }

    /// Like [`Self::decide`], pushing recoverable problems onto `issues`.
    pub fn decide_collecting(&self, record: &StringRecord, issues: &mut Vec<Error>) -> Decision {
        let ctx = RecordContext::new(record, self.dictionaries, self.special_cases);
        let mut decision = cascade::run(&self.steps, &ctx, issues);

        if matches!(decision.kind, DecisionKind::Transform | DecisionKind::Dictionary) {
            if let Emit::Translated(text) = &decision.emit {
                decision.emit = Emit::Translated(self.resolver().translate_parentheses(text));
            }
        }
        decision
    }

    /// Rewrites every record of `source` without touching deferred blocks.
    pub fn translate_records(&self, source: &str) -> TranslatedDocument {
        let total = document::scan(source)
            .iter()
            .filter(|span| !span.is_blank())
            .count();
        let mut state = RunState::new(total);
        let text = document::rewrite(source, |span| self.process_record(span, &mut state));
        TranslatedDocument {
            text,
            stats: state.stats,
            blocks_applied: 0,
            issues: state.issues,
        }
    }

    /// Translates the document at logical `path` and inserts its `add_block`s.
    pub fn translate_document(&self, source: &str, path: &str) -> TranslatedDocument {
        let mut translated = self.translate_records(source);
        let outcome = apply_blocks(translated.text, self.special_cases.blocks_for(path), path);

        info!("Processing completed for {}", path);
        info!("{}", translated.stats);
        translated.text = outcome.text;
        translated.blocks_applied = outcome.applied;
        translated.issues.extend(outcome.issues);
        translated
    }

    fn process_record(&self, span: &RecordSpan<'_>, state: &mut RunState) -> Option<String> {
        if span.is_blank() {
            return None;
        }
        state.position += 1;

        let record = span.to_record();
        let decision = self.decide_collecting(&record, &mut state.issues);
        state.stats.record(&record, &decision);
        self.log_decision(&record, &decision, state);

        match decision.emit {
            Emit::Original => None,
            Emit::Translated(text) => Some(span.with_text(&text)),
        }
    }

    fn log_decision(&self, record: &StringRecord, decision: &Decision, state: &RunState) {
        let total = state.stats.total.max(1);
        let percent = state.position as f64 * 100.0 / total as f64;
        let prefix = match &self.options.label {
            Some(label) => format!("[{}] ", label),
            None => String::new(),
        };
        let progress = format!(
            "{}[{:04}/{} - {:.1}%]",
            prefix, state.position, state.stats.total, percent
        );
        let lang = self.options.language.to_uppercase();

        match (&decision.kind, &decision.emit) {
            (DecisionKind::Untranslated, _) => {
                info!("{} - [EN] {} = [NO TRANSLATION]", progress, record.text);
            }
            (DecisionKind::Dictionary, Emit::Translated(text)) => {
                info!(
                    "{} - [EN] {} = [{}] {} ({})",
                    progress,
                    record.text,
                    lang,
                    text,
                    decision.reason.as_deref().unwrap_or_default()
                );
            }
            (kind, emit) => {
                info!(
                    "{} - [{}] ID:{} - {}",
                    progress,
                    kind.tag(),
                    record.id,
                    decision.reason.as_deref().unwrap_or_default()
                );
                if let Emit::Translated(text) = emit {
                    debug!("  [EN] {} = [{}] {}", record.text, lang, text);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dictionary::DictionaryBuilder, traits::Source, types::Category};

    fn dictionaries() -> Dictionaries {
        let mut builder = DictionaryBuilder::new();
        builder
            .insert(Category::Type, "Fire", "Fuoco")
            .insert(Category::Type, "Water", "Acqua")
            .insert(Category::Item, "Mystic Water", "Acqua Magica");
        builder.build()
    }

    #[test]
    fn test_parenthesis_pass_after_dictionary() {
        let dicts = dictionaries();
        let cases = SpecialCases::new();
        let engine = Engine::new(&dicts, &cases);
        let decision = engine.decide(&StringRecord::new("1", "Mystic Water (Water)"));
        assert_eq!(
            decision.emit,
            Emit::Translated("Acqua Magica (Acqua)".to_string())
        );
    }

    #[test]
    fn test_parenthesis_pass_after_transform() {
        let dicts = dictionaries();
        let cases = SpecialCases::from_str(
            r#"{ "transform_translation": { "ids": [ { "id": "2", "patterns": [
                { "regex": "^Boost (\\w+)$", "template": "Potenzia {group1} (Water)" }
            ] } ] } }"#,
        )
        .unwrap();
        let engine = Engine::new(&dicts, &cases);
        let decision = engine.decide(&StringRecord::new("2", "Boost Fire"));
        assert_eq!(
            decision.emit,
            Emit::Translated("Potenzia Fire (Acqua)".to_string())
        );
    }

    #[test]
    fn test_override_is_not_post_processed() {
        let dicts = dictionaries();
        let cases = SpecialCases::from_str(
            r#"{ "override_translation": { "ids": [ { "id": "3", "translation": "Keep (Water)" } ] } }"#,
        )
        .unwrap();
        let engine = Engine::new(&dicts, &cases);
        let decision = engine.decide(&StringRecord::new("3", "anything"));
        assert_eq!(decision.emit, Emit::Translated("Keep (Water)".to_string()));
    }

    #[test]
    fn test_blank_records_are_not_counted() {
        let dicts = dictionaries();
        let cases = SpecialCases::new();
        let engine = Engine::new(&dicts, &cases);
        let source = r#"<s><string id="1">Fire</string><string id="2">  </string></s>"#;
        let translated = engine.translate_records(source);
        assert_eq!(
            translated.text,
            r#"<s><string id="1">Fuoco</string><string id="2">  </string></s>"#
        );
        assert_eq!(translated.stats.total, 1);
        assert_eq!(translated.stats.translated, 1);
        assert!(translated.issues.is_empty());
    }

    #[test]
    fn test_template_failures_are_reported_with_the_document() {
        let dicts = dictionaries();
        let cases = SpecialCases::from_str(
            r#"{ "transform_translation": { "ids": [
                { "id": "1", "patterns": [ { "regex": "^Fire$", "template": "{nope}" } ] }
            ] } }"#,
        )
        .unwrap();
        let engine = Engine::new(&dicts, &cases);
        let translated =
            engine.translate_document(r#"<s><string id="1">Fire</string></s>"#, "doc.xml");

        // the record still falls through to the dictionary
        assert_eq!(translated.text, r#"<s><string id="1">Fuoco</string></s>"#);
        assert_eq!(translated.issues.len(), 1);
        assert!(matches!(
            &translated.issues[0],
            Error::TemplateFill { variable, .. } if variable == "nope"
        ));
    }
}
