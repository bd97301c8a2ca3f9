//! Record identifiers and the `<int>-<int>` range shorthand used by special cases.

use crate::error::Error;

/// Largest number of ids a single range key may stand for.
pub const MAX_RANGE_LEN: u64 = 1_000_000;

/// A special-case key after parsing: one literal id or an inclusive numeric range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSpec {
    Single(String),
    Range { start: u64, end: u64 },
}

impl IdSpec {
    /// Parses a raw key.
    ///
    /// A key is treated as a range when it contains `-` and nothing but digits, dashes
    /// and dots. Such a key must then be exactly two integers with `start <= end`
    /// spanning at most [`MAX_RANGE_LEN`] ids, otherwise it is a
    /// [`Error::MalformedRange`]. Anything else is a literal id.
    ///
    /// ```rust
    /// use dexlate::ids::IdSpec;
    /// assert_eq!(IdSpec::parse("10-12").unwrap(), IdSpec::Range { start: 10, end: 12 });
    /// assert_eq!(IdSpec::parse("intro-text").unwrap(), IdSpec::Single("intro-text".into()));
    /// assert!(IdSpec::parse("1.5-3").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<IdSpec, Error> {
        if !looks_like_range(raw) {
            return Ok(IdSpec::Single(raw.to_string()));
        }

        let malformed = || Error::MalformedRange(raw.to_string());
        let mut parts = raw.split('-');
        let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let start: u64 = start.parse().map_err(|_| malformed())?;
        let end: u64 = end.parse().map_err(|_| malformed())?;
        if start > end || end - start >= MAX_RANGE_LEN {
            return Err(malformed());
        }
        Ok(IdSpec::Range { start, end })
    }

    /// Number of record ids this key stands for.
    pub fn len(&self) -> u64 {
        match self {
            IdSpec::Single(_) => 1,
            IdSpec::Range { start, end } => (end - start).saturating_add(1),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, IdSpec::Range { .. })
    }

    /// Every concrete id, in ascending order for ranges.
    pub fn ids(&self) -> Box<dyn Iterator<Item = String> + '_> {
        match self {
            IdSpec::Single(id) => Box::new(std::iter::once(id.clone())),
            IdSpec::Range { start, end } => Box::new((*start..=*end).map(|n| n.to_string())),
        }
    }
}

fn looks_like_range(raw: &str) -> bool {
    raw.contains('-')
        && raw.chars().any(|c| c.is_ascii_digit())
        && raw.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '.')
}
