//! The mod manifest (`info.xml`): which documents a mod ships, and the edited copy
//! written next to the translated output.
//!
//! The list of documents is read with a real XML parser. Edits to the output copy are
//! done textually so that formatting, comments and attribute order survive.

use std::{
    borrow::Cow,
    io::{BufRead, Read},
    path::Path,
};

use lazy_static::lazy_static;
use log::{info, warn};
use quick_xml::{Reader, escape::escape, events::Event};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::Error, special_cases::normalize_path, traits::Source};

pub const MANIFEST_FILE: &str = "info.xml";

/// A parsed manifest: the raw text plus the document paths it lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    raw: String,
    paths: Vec<String>,
}

impl Source for Manifest {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Manifest::parse(raw)
    }
}

impl Manifest {
    /// Collects the `path` of every `<string>` inside `<strings>`.
    ///
    /// A manifest without a `<strings>` element is [`Error::InvalidManifest`].
    pub fn parse(raw: impl Into<String>) -> Result<Self, Error> {
        let raw = raw.into();
        let paths = listed_paths(&raw)?;
        Ok(Manifest { raw, paths })
    }

    /// Document paths in manifest order, relative to the mod's input directory.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The listed paths that exist under `input_dir`; missing ones are warned about.
    pub fn existing_paths(&self, input_dir: &Path) -> Vec<String> {
        let mut found = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            if input_dir.join(path).is_file() {
                info!("  Found file: {}", path);
                found.push(path.clone());
            } else {
                warn!("  File not found: {}", path);
            }
        }
        info!("Extracted {} files from {}", found.len(), MANIFEST_FILE);
        found
    }

    /// The text of the output manifest: `edits` applied to `<resource>`, and the
    /// `<string path>` entries of `skipped` documents removed.
    pub fn render(&self, edits: &ManifestEdits, skipped: &[String]) -> String {
        let text = edits.apply(&self.raw);
        if skipped.is_empty() {
            return text;
        }
        let skipped: Vec<String> = skipped.iter().map(|p| normalize_path(p)).collect();
        let pruned = STRING_ENTRY.replace_all(&text, |caps: &regex::Captures| {
            if skipped.contains(&normalize_path(&caps[1])) {
                info!("Removed from {}: {}", MANIFEST_FILE, &caps[1]);
                String::new()
            } else {
                caps[0].to_string()
            }
        });
        pruned.into_owned()
    }
}

fn listed_paths(raw: &str) -> Result<Vec<String>, Error> {
    let mut reader = Reader::from_reader(raw.as_bytes());
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut paths = Vec::new();
    let mut seen_strings = false;
    let mut depth_in_strings = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if depth_in_strings > 0 {
                    depth_in_strings += 1;
                    if e.name().as_ref() == b"string" {
                        paths.extend(path_attribute(e)?);
                    }
                } else if e.name().as_ref() == b"strings" {
                    seen_strings = true;
                    depth_in_strings = 1;
                }
            }
            Ok(Event::Empty(ref e)) => {
                if depth_in_strings > 0 && e.name().as_ref() == b"string" {
                    paths.extend(path_attribute(e)?);
                } else if e.name().as_ref() == b"strings" {
                    seen_strings = true;
                }
            }
            Ok(Event::End(_)) => {
                depth_in_strings = depth_in_strings.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::XmlParse(e)),
        }
        buf.clear();
    }

    if !seen_strings {
        return Err(Error::InvalidManifest(
            "no <strings> element found".to_string(),
        ));
    }
    Ok(paths)
}

fn path_attribute(e: &quick_xml::events::BytesStart<'_>) -> Result<Option<String>, Error> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::InvalidManifest(e.to_string()))?;
        if attr.key.as_ref() == b"path" {
            let value = attr.unescape_value()?.to_string();
            return Ok((!value.is_empty()).then_some(value));
        }
    }
    Ok(None)
}

lazy_static! {
    /// One `<string path="..."/>` entry, with its indentation and line break.
    static ref STRING_ENTRY: Regex =
        Regex::new(r#"(?m)^[ \t]*<string\s+[^>]*?\bpath="([^"]*)"[^>]*/>[ \t]*(?:\r?\n)?"#).unwrap();
}

/// Suffixes appended to attributes of the manifest's `<resource>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ManifestEdits {
    pub name_suffix: Option<String>,
    /// May contain `{version}`, replaced by [`Self::version`].
    pub version_suffix: Option<String>,
    pub author_suffix: Option<String>,
    pub description_suffix: Option<String>,
    /// The translated mod's own version.
    pub version: Option<String>,
}

impl ManifestEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.name_suffix = Some(suffix.into());
        self
    }

    pub fn with_version_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.version_suffix = Some(suffix.into());
        self
    }

    pub fn with_author_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.author_suffix = Some(suffix.into());
        self
    }

    pub fn with_description_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.description_suffix = Some(suffix.into());
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name_suffix.is_none()
            && self.version_suffix.is_none()
            && self.author_suffix.is_none()
            && self.description_suffix.is_none()
    }

    /// Applies every configured suffix to the first `<resource>` element of `manifest`.
    pub fn apply(&self, manifest: &str) -> String {
        let version_suffix = self.version_suffix.as_deref().map(|suffix| {
            suffix.replace("{version}", self.version.as_deref().unwrap_or_default())
        });

        let mut text = Cow::Borrowed(manifest);
        for (attribute, suffix) in [
            ("name", self.name_suffix.as_deref()),
            ("version", version_suffix.as_deref()),
            ("author", self.author_suffix.as_deref()),
            ("description", self.description_suffix.as_deref()),
        ] {
            let Some(suffix) = suffix.filter(|s| !s.is_empty()) else {
                continue;
            };
            text = Cow::Owned(append_to_attribute(&text, attribute, suffix));
        }
        text.into_owned()
    }
}

fn append_to_attribute(text: &str, attribute: &str, suffix: &str) -> String {
    let pattern = format!(r#"(<resource\s+[^>]*?\b{}=")([^"]*)""#, attribute);
    let Ok(regex) = Regex::new(&pattern) else {
        return text.to_string();
    };
    let escaped = escape(suffix);
    regex
        .replacen(text, 1, |caps: &regex::Captures| {
            format!("{}{}{}\"", &caps[1], &caps[2], escaped)
        })
        .into_owned()
}
