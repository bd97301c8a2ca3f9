//! The per-record cascade: an ordered list of steps, each either settling the record
//! or passing it on.
//!
//! Default order (see [`default_steps`]):
//! 1. [`OverrideStep`]: overlay `override_translation`
//! 2. [`NoTranslationStep`]: overlay `no_translation`
//! 3. [`TransformStep`]: overlay `transform_translation`
//! 4. [`LegacyStep`]: legacy per-id entries
//! 5. [`DictionaryStep`]: whole-text, then partial dictionary substitution
//!
//! The last step always decides, so the cascade is total.

use std::{collections::HashMap, ops::Range};

use log::{debug, warn};
use regex::{NoExpand, Regex};

use crate::{
    dictionary::{Dictionaries, TermIndex},
    error::Error,
    resolver::ContextResolver,
    special_cases::{LegacyKind, SpecialCases},
    template,
    types::{Decision, DecisionKind, StringRecord, find_term},
};

/// Everything a step may read while deciding one record.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub record: &'a StringRecord,
    pub dictionaries: &'a Dictionaries,
    pub special_cases: &'a SpecialCases,
    pub resolver: ContextResolver<'a>,
}

impl<'a> RecordContext<'a> {
    pub fn new(
        record: &'a StringRecord,
        dictionaries: &'a Dictionaries,
        special_cases: &'a SpecialCases,
    ) -> Self {
        RecordContext {
            record,
            dictionaries,
            special_cases,
            resolver: ContextResolver::new(dictionaries),
        }
    }
}

#[derive(Debug)]
pub enum StepOutcome {
    Decided(Decision),
    NotApplicable,
    /// The step applied but could not produce text; the cascade moves on.
    Failed(Error),
}

/// One link of the cascade.
pub trait CascadeStep: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &RecordContext<'_>) -> StepOutcome;
}

/// The steps in their fixed order.
pub fn default_steps() -> Vec<Box<dyn CascadeStep>> {
    vec![
        Box::new(OverrideStep),
        Box::new(NoTranslationStep),
        Box::new(TransformStep),
        Box::new(LegacyStep),
        Box::new(DictionaryStep),
    ]
}

/// Runs `steps` in order and returns the first decision.
///
/// Step failures are logged, pushed onto `issues`, and the next step is tried.
/// Falls back to leaving the record untranslated if no step decides, which only
/// happens with a custom step list lacking [`DictionaryStep`].
pub fn run(
    steps: &[Box<dyn CascadeStep>],
    ctx: &RecordContext<'_>,
    issues: &mut Vec<Error>,
) -> Decision {
    for step in steps {
        match step.apply(ctx) {
            StepOutcome::Decided(decision) => {
                debug!("id {} settled by {}", ctx.record.id, step.name());
                return decision;
            }
            StepOutcome::Failed(e) => {
                warn!("{} failed for id {}: {}", step.name(), ctx.record.id, e);
                issues.push(e);
            }
            StepOutcome::NotApplicable => {}
        }
    }
    Decision::original(DecisionKind::Untranslated, None)
}

pub struct OverrideStep;

impl CascadeStep for OverrideStep {
    fn name(&self) -> &'static str {
        "override"
    }

    fn apply(&self, ctx: &RecordContext<'_>) -> StepOutcome {
        match ctx.special_cases.override_for(&ctx.record.id) {
            Some(o) => StepOutcome::Decided(Decision::translated(
                DecisionKind::Override,
                o.translation.clone(),
                Some(o.reason.clone().unwrap_or_else(|| "Global override".to_string())),
            )),
            None => StepOutcome::NotApplicable,
        }
    }
}

pub struct NoTranslationStep;

impl CascadeStep for NoTranslationStep {
    fn name(&self) -> &'static str {
        "no_translation"
    }

    fn apply(&self, ctx: &RecordContext<'_>) -> StepOutcome {
        if ctx.special_cases.is_no_translation(&ctx.record.id) {
            StepOutcome::Decided(Decision::original(
                DecisionKind::NoTranslation,
                Some("Global category".to_string()),
            ))
        } else {
            StepOutcome::NotApplicable
        }
    }
}

pub struct TransformStep;

impl CascadeStep for TransformStep {
    fn name(&self) -> &'static str {
        "transform"
    }

    fn apply(&self, ctx: &RecordContext<'_>) -> StepOutcome {
        let Some(transform) = ctx.special_cases.transform_for(&ctx.record.id) else {
            return StepOutcome::NotApplicable;
        };
        let text = ctx.record.text.as_str();

        for pattern in &transform.patterns {
            let Some(caps) = pattern.regex.captures(text) else {
                continue;
            };

            let mut vars: HashMap<String, String> = HashMap::new();
            vars.insert("original".to_string(), text.to_string());
            vars.insert("match".to_string(), caps[0].to_string());
            for i in 1..caps.len() {
                let group = caps.get(i).map_or("", |m| m.as_str());
                vars.insert(format!("group{i}"), group.to_string());
            }
            for name in pattern.regex.capture_names().flatten() {
                let group = caps.name(name).map_or("", |m| m.as_str());
                vars.insert(name.to_string(), group.to_string());
            }

            let main_term = if caps.len() > 1 {
                caps.get(1).map_or("", |m| m.as_str())
            } else {
                text
            };
            let translated = translate_main_term(ctx, main_term).unwrap_or(main_term);
            vars.insert("translated".to_string(), translated.to_string());

            match template::fill(&ctx.record.id, &pattern.template, &vars) {
                Ok(result) => {
                    let reason = pattern
                        .description
                        .clone()
                        .or_else(|| transform.reason.clone())
                        .unwrap_or_else(|| "Transformation".to_string());
                    return StepOutcome::Decided(Decision::translated(
                        DecisionKind::Transform,
                        result,
                        Some(reason),
                    ));
                }
                // only the first matching pattern is ever tried
                Err(e) => return StepOutcome::Failed(e),
            }
        }
        StepOutcome::NotApplicable
    }
}

/// Record-scoped terms, then the overlay's global terms, then the resolver.
fn translate_main_term<'a>(ctx: &RecordContext<'a>, term: &str) -> Option<&'a str> {
    let non_empty = |t: &&str| !t.is_empty();
    ctx.special_cases
        .record_terms(&ctx.record.id)
        .and_then(|terms| find_term(terms, term))
        .filter(non_empty)
        .or_else(|| find_term(ctx.special_cases.global_terms(), term).filter(non_empty))
        .or_else(|| ctx.resolver.resolve(term, &ctx.record.text).filter(non_empty))
}

pub struct LegacyStep;

impl CascadeStep for LegacyStep {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn apply(&self, ctx: &RecordContext<'_>) -> StepOutcome {
        let Some(case) = ctx.special_cases.legacy_for(&ctx.record.id) else {
            return StepOutcome::NotApplicable;
        };

        match case.kind {
            LegacyKind::NoTranslation => StepOutcome::Decided(Decision::original(
                DecisionKind::LegacyNoTranslation,
                Some(case.reason.clone().unwrap_or_else(|| "Special case".to_string())),
            )),
            LegacyKind::AddTranslation if !case.translations.is_empty() => {
                let text = ctx.record.text.as_str();
                let mut working = text.to_string();
                for (term, translation) in &case.translations {
                    let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(term))) else {
                        continue;
                    };
                    if pattern.is_match(&working) {
                        working = pattern
                            .replace_all(&working, NoExpand(translation))
                            .into_owned();
                    }
                }
                if working != text {
                    StepOutcome::Decided(Decision::translated(
                        DecisionKind::LegacyAddTranslation,
                        working,
                        Some(case.reason.clone().unwrap_or_else(|| "Added translation".to_string())),
                    ))
                } else {
                    StepOutcome::NotApplicable
                }
            }
            _ => StepOutcome::NotApplicable,
        }
    }
}

pub struct DictionaryStep;

impl CascadeStep for DictionaryStep {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn apply(&self, ctx: &RecordContext<'_>) -> StepOutcome {
        let text = ctx.record.text.as_str();

        if let Some((translation, category)) = ctx.resolver.resolve_with_category(text, text) {
            if !translation.is_empty() {
                return StepOutcome::Decided(Decision::translated(
                    DecisionKind::Dictionary,
                    translation.to_string(),
                    Some(category.to_string()),
                ));
            }
        }

        let working = substitute_terms(ctx.dictionaries.term_index(), &ctx.resolver, text);
        if working != text {
            StepOutcome::Decided(Decision::translated(
                DecisionKind::Dictionary,
                working,
                Some("partial".to_string()),
            ))
        } else {
            StepOutcome::Decided(Decision::original(DecisionKind::Untranslated, None))
        }
    }
}

struct Piece {
    text: String,
    /// Already replaced; later terms must not touch it.
    frozen: bool,
}

/// Replaces dictionary terms inside `original`, longest terms first.
///
/// Each term is matched against the current working text, but only inside spans no
/// earlier term has replaced, so a translation is never translated again. The
/// resolver decides each term against the untouched `original`.
pub fn substitute_terms(index: &TermIndex, resolver: &ContextResolver<'_>, original: &str) -> String {
    let mut pieces = vec![Piece {
        text: original.to_string(),
        frozen: false,
    }];
    let mut working = original.to_string();

    for entry in index.iter() {
        if !entry.regex.is_match(&working) {
            continue;
        }

        let starts: Vec<usize> = pieces
            .iter()
            .scan(0, |offset, piece| {
                let start = *offset;
                *offset += piece.text.len();
                Some(start)
            })
            .collect();

        let hits: Vec<(usize, Range<usize>)> = entry
            .regex
            .find_iter(&working)
            .filter(|m| !m.is_empty())
            .filter_map(|m| {
                let i = starts.partition_point(|&s| s <= m.start()).checked_sub(1)?;
                let piece = &pieces[i];
                let local = m.start() - starts[i]..m.end() - starts[i];
                (!piece.frozen && local.end <= piece.text.len()).then_some((i, local))
            })
            .collect();
        if hits.is_empty() {
            continue;
        }

        let Some(translation) = resolver.resolve(&entry.term, original).filter(|t| !t.is_empty())
        else {
            continue;
        };

        let mut hits = hits.into_iter().peekable();
        let mut next = Vec::with_capacity(pieces.len() + 2);
        for (i, piece) in pieces.into_iter().enumerate() {
            if piece.frozen {
                next.push(piece);
                continue;
            }
            let mut cursor = 0;
            while let Some((_, range)) = hits.next_if(|(j, _)| *j == i) {
                if range.start > cursor {
                    next.push(Piece {
                        text: piece.text[cursor..range.start].to_string(),
                        frozen: false,
                    });
                }
                next.push(Piece {
                    text: translation.to_string(),
                    frozen: true,
                });
                cursor = range.end;
            }
            if cursor < piece.text.len() {
                next.push(Piece {
                    text: piece.text[cursor..].to_string(),
                    frozen: false,
                });
            }
        }
        pieces = next;
        working = pieces.iter().map(|p| p.text.as_str()).collect();
    }

    working
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
            .insert(Category::Generic, "Fuoco", "NOPE")
            .insert(Category::Item, "Fire Stone", "Pietra Fuoco")
            .insert(Category::Item, "Stone", "Pietra");
        builder.build()
    }

    fn decide(cases: &SpecialCases, dicts: &Dictionaries, id: &str, text: &str) -> Decision {
        let record = StringRecord::new(id, text);
        let ctx = RecordContext::new(&record, dicts, cases);
        run(&default_steps(), &ctx, &mut Vec::new())
    }

    #[test]
    fn test_override_beats_no_translation() {
        let cases = SpecialCases::from_str(
            r#"{
                "override_translation": { "ids": [ { "id": "1", "translation": "Forced" } ] },
                "no_translation": { "ids": [ { "id": "1" } ] }
            }"#,
        )
        .unwrap();
        let decision = decide(&cases, &dictionaries(), "1", "Fire");
        assert_eq!(decision.kind, DecisionKind::Override);
        assert_eq!(decision.emit, crate::types::Emit::Translated("Forced".into()));
    }

    #[test]
    fn test_transform_with_translated_group() {
        let cases = SpecialCases::from_str(
            r#"{ "transform_translation": { "ids": [ { "id": "4", "patterns": [
                { "regex": "^Gem \\((\\w+)\\)$", "template": "Gemma {translated}" }
            ] } ] } }"#,
        )
        .unwrap();
        let decision = decide(&cases, &dictionaries(), "4", "Gem (Fire)");
        assert_eq!(decision.kind, DecisionKind::Transform);
        assert_eq!(decision.emit, crate::types::Emit::Translated("Gemma Fuoco".into()));
    }

    #[test]
    fn test_transform_named_groups_and_template_error_falls_through() {
        let cases = SpecialCases::from_str(
            r#"{ "transform_translation": { "ids": [
                { "id": "5", "patterns": [ { "regex": "^No\\.(?P<num>\\d+)$", "template": "N.{num}" } ] },
                { "id": "6", "patterns": [
                    { "regex": "^Fire$", "template": "{missing}" },
                    { "regex": "^Fire$", "template": "never used" }
                ] }
            ] } }"#,
        )
        .unwrap();
        let dicts = dictionaries();
        assert_eq!(
            decide(&cases, &dicts, "5", "No.25").emit,
            crate::types::Emit::Translated("N.25".into())
        );

        let record = StringRecord::new("6", "Fire");
        let ctx = RecordContext::new(&record, &dicts, &cases);
        let mut issues = Vec::new();
        let fallback = run(&default_steps(), &ctx, &mut issues);
        assert_eq!(fallback.kind, DecisionKind::Dictionary);
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0],
            Error::TemplateFill { id, variable } if id == "6" && variable == "missing"
        ));
    }

    #[test]
    fn test_legacy_add_translation_is_case_sensitive() {
        let cases = SpecialCases::from_str(
            r#"{ "8": { "type": "add_translation", "translations": { "Surf": "Surf$1" } } }"#,
        )
        .unwrap();
        let dicts = dictionaries();
        let hit = decide(&cases, &dicts, "8", "Use Surf now");
        assert_eq!(hit.kind, DecisionKind::LegacyAddTranslation);
        assert_eq!(hit.emit, crate::types::Emit::Translated("Use Surf$1 now".into()));

        let miss = decide(&cases, &dicts, "8", "use surf now");
        assert_eq!(miss.kind, DecisionKind::Untranslated);
    }

    #[test]
    fn test_legacy_add_translation_follows_file_order() {
        let cases = SpecialCases::from_str(
            r#"{ "9": { "type": "add_translation",
                "translations": { "Rock Smash": "Spaccaroccia", "Rock": "Roccia" } } }"#,
        )
        .unwrap();
        let decision = decide(&cases, &dictionaries(), "9", "Use Rock Smash");
        assert_eq!(decision.kind, DecisionKind::LegacyAddTranslation);
        assert_eq!(decision.emit, crate::types::Emit::Translated("Use Spaccaroccia".into()));
    }

    #[test]
    fn test_partial_substitution_uses_context() {
        let dicts = dictionaries();
        let resolver = ContextResolver::new(&dicts);
        let out = substitute_terms(dicts.term_index(), &resolver, "Fire type moves");
        assert_eq!(out, "Fuoco type moves");
    }

    #[test]
    fn test_partial_substitution_never_retranslates() {
        let dicts = dictionaries();
        let resolver = ContextResolver::new(&dicts);
        // the generic "Fuoco" entry must not touch the "Pietra Fuoco" just written
        let out = substitute_terms(dicts.term_index(), &resolver, "Evolves with a Fire Stone");
        assert_eq!(out, "Evolves with a Pietra Fuoco");
    }

    #[test]
    fn test_partial_substitution_longest_first() {
        let dicts = dictionaries();
        let resolver = ContextResolver::new(&dicts);
        let out = substitute_terms(
            dicts.term_index(),
            &resolver,
            "Evolves with a Fire Stone or a Stone",
        );
        assert_eq!(out, "Evolves with a Pietra Fuoco or a Pietra");
    }

    #[test]
    fn test_untranslated_default() {
        let decision = decide(&SpecialCases::new(), &dictionaries(), "9", "Nothing to see");
        assert_eq!(decision.kind, DecisionKind::Untranslated);
        assert_eq!(decision.emit, crate::types::Emit::Original);
    }
}
