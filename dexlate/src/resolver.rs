//! Contextual resolution: which category dictionary, if any, supplies a term's
//! translation given the text the term appears in.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{dictionary::Dictionaries, types::Category};

/// Context longer than this many characters is treated as narrative text.
pub const LONG_FORM_CHARS: usize = 50;

/// Context with at most this many words may fall back to the generic dictionary.
pub const SHORT_CONTEXT_WORDS: usize = 3;

/// Phrases that mark dialogue or descriptions.
pub const CONVERSATIONAL_MARKERS: &[&str] = &[
    "hello",
    "hi ",
    "thank you",
    "would you like",
    "do you want",
    "i am",
    "i can",
    "it is",
    "the user",
    "the target",
    "you have",
    "sorry",
    "congratulations",
    "welcome",
];

pub const TYPE_INDICATORS: &[&str] = &[
    "incense",
    "plate",
    "berry",
    "gem",
    "type",
    "resistance",
    "weakness",
    "power",
    "boost",
    "stone",
    "charm",
];

pub const MOVE_INDICATORS: &[&str] = &[
    "learns", "teach", "tutor", "tm", "level up", "move", "attack", "skill",
];

pub const ABILITY_INDICATORS: &[&str] = &["ability", "abilities", "hidden", "effect", "activates"];

lazy_static! {
    static ref PARENTHESIZED: Regex = Regex::new(r"\(([^)]+)\)").unwrap();
}

/// Whether `context` reads like dialogue or a description rather than a label.
pub fn is_long_form(context: &str) -> bool {
    let lower = context.to_lowercase();
    context.chars().count() > LONG_FORM_CHARS
        || CONVERSATIONAL_MARKERS.iter().any(|m| lower.contains(m))
}

fn contains_any(haystack_lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack_lower.contains(n))
}

/// Picks a translation for a term by looking at its surrounding text.
///
/// Pure and deterministic: it only reads the frozen dictionaries.
#[derive(Debug, Clone, Copy)]
pub struct ContextResolver<'a> {
    dictionaries: &'a Dictionaries,
}

impl<'a> ContextResolver<'a> {
    pub fn new(dictionaries: &'a Dictionaries) -> Self {
        ContextResolver { dictionaries }
    }

    /// Resolves `term` against `context`; see [`Self::resolve_with_category`].
    pub fn resolve(&self, term: &str, context: &str) -> Option<&'a str> {
        self.resolve_with_category(term, context).map(|(t, _)| t)
    }

    /// Resolves `term` and reports which dictionary answered.
    ///
    /// First match wins:
    /// 1. long-form context and a single-word term: nothing
    /// 2. term is exactly the first parenthesized span of the context: type
    /// 3. item, 4. move, 5. ability, by direct lookup
    /// 6. type, if the context mentions a type indicator
    /// 7. move, if the context is short and mentions a move indicator
    /// 8. ability, if the context mentions an ability indicator
    /// 9. generic, if the context has at most three words or equals the term; a context
    ///    that is exactly the term may still fall back to type
    pub fn resolve_with_category(&self, term: &str, context: &str) -> Option<(&'a str, Category)> {
        let dicts = self.dictionaries;
        let lower = context.to_lowercase();
        let long_form = is_long_form(context);

        if long_form && term.split_whitespace().count() == 1 {
            return None;
        }

        if let Some(caps) = PARENTHESIZED.captures(context) {
            if &caps[1] == term {
                if let Some(t) = dicts.get(Category::Type, term) {
                    return Some((t, Category::Type));
                }
            }
        }

        for category in [Category::Item, Category::Move, Category::Ability] {
            if let Some(t) = dicts.get(category, term) {
                return Some((t, category));
            }
        }

        if contains_any(&lower, TYPE_INDICATORS) {
            if let Some(t) = dicts.get(Category::Type, term) {
                return Some((t, Category::Type));
            }
        }

        // 7 and 8 only answer for terms that 4 and 5 already resolved.
        if !long_form && contains_any(&lower, MOVE_INDICATORS) {
            if let Some(t) = dicts.get(Category::Move, term) {
                return Some((t, Category::Move));
            }
        }

        if contains_any(&lower, ABILITY_INDICATORS) {
            if let Some(t) = dicts.get(Category::Ability, term) {
                return Some((t, Category::Ability));
            }
        }

        if context.split_whitespace().count() <= SHORT_CONTEXT_WORDS || term == context {
            if let Some(t) = dicts.get(Category::Generic, term) {
                return Some((t, Category::Generic));
            }
            // a bare label that is only a type name is that type
            if term == context {
                return dicts.get(Category::Type, term).map(|t| (t, Category::Type));
            }
        }

        None
    }

    /// Rewrites every parenthesized span whose content is a type name.
    ///
    /// Parentheses always mark a type, whatever produced the surrounding text.
    pub fn translate_parentheses(&self, text: &str) -> String {
        if !text.contains('(') || !text.contains(')') {
            return text.to_string();
        }
        PARENTHESIZED
            .replace_all(text, |caps: &regex::Captures| {
                match self.dictionaries.get(Category::Type, &caps[1]) {
                    Some(t) => format!("({t})"),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
