//! Traits for loading dexlate inputs from files, readers and strings.

use std::{
    fs::File,
    io::{BufRead, BufReader, Cursor},
    path::Path,
};

use crate::error::Error;

/// A trait for loading one input file (a dictionary, a special-cases overlay, ...).
///
/// # Example
///
/// ```rust,no_run
/// use dexlate::traits::Source;
/// use dexlate::SpecialCases;
/// let cases = SpecialCases::read_from("translations/it/special_cases-it.json")?;
/// println!("{} overrides", cases.summary().overrides);
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Source {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path.
    ///
    /// A missing file is reported as [`Error::ConfigNotFound`] and malformed JSON as
    /// [`Error::MalformedJson`] carrying the path.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            Error::Parse(source) => Error::malformed_json(path, source),
            other => other,
        })
    }

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }
}
