//! ISIS subfield notation: parsing and serialization.
//!
//! An ISIS field value packs several labeled sub-values into one string using
//! `^k` markers, where `k` is a single character in `[a-z0-9]`:
//!
//! ```text
//! John Tenniel^rillustrator
//! ```
//!
//! [`parse`] expands such a string into an ordered list of [`Subfield`]s. The
//! unlabeled leading segment is always present under [`MAIN_SUBFIELD_KEY`],
//! even when empty. [`serialize`] is the inverse.
//!
//! # Examples
//!
//! ```
//! use isisdm::subfield::{parse, serialize, Subfield};
//!
//! let subfields = parse("John Tenniel^rillustrator", None);
//! assert_eq!(
//!     subfields,
//!     vec![Subfield::new('_', "John Tenniel"), Subfield::new('r', "illustrator")]
//! );
//! assert_eq!(serialize(&subfields), "John Tenniel^rillustrator");
//! ```

use crate::error::{IsisError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Key of the unlabeled leading segment of a field.
pub const MAIN_SUBFIELD_KEY: char = '_';

/// Character that introduces a subfield marker.
pub const SUBFIELD_DELIMITER: char = '^';

const DOUBLED_DELIMITER: &str = "^^";

lazy_static! {
    static ref SUBFIELD_MARKER: Regex =
        Regex::new(r"\^([a-zA-Z0-9])").expect("subfield marker pattern is valid");
}

/// A labeled segment of an ISIS field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield key, lowercase `[a-z0-9]` or [`MAIN_SUBFIELD_KEY`]
    pub key: char,
    /// Subfield text
    pub value: String,
}

impl Subfield {
    /// Create a subfield from a key and its text.
    #[must_use]
    pub fn new(key: char, value: impl Into<String>) -> Self {
        Subfield {
            key,
            value: value.into(),
        }
    }

    /// Create the unlabeled leading subfield.
    #[must_use]
    pub fn main(value: impl Into<String>) -> Self {
        Subfield::new(MAIN_SUBFIELD_KEY, value)
    }

    /// Whether this is the unlabeled leading subfield.
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.key == MAIN_SUBFIELD_KEY
    }
}

/// Check that `key` may label a subfield: `_` or lowercase `[a-z0-9]`.
#[must_use]
pub fn is_valid_key(key: char) -> bool {
    key == MAIN_SUBFIELD_KEY || key.is_ascii_digit() || key.is_ascii_lowercase()
}

/// A set of recognized subfield keys.
///
/// When a field declares its keys, only markers using one of them split the
/// value; every other `^k` sequence stays in the text.
#[derive(Debug, Clone)]
pub struct SubfieldKeys {
    keys: String,
    marker: Option<Regex>,
}

impl SubfieldKeys {
    /// Build a key set from its characters, e.g. `"fl"`.
    ///
    /// Keys are case-insensitive and stored lowercase. An empty string is a
    /// valid set that recognizes no markers at all.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::Configuration`] if any character is outside `[a-zA-Z0-9]`.
    pub fn new(keys: &str) -> Result<Self> {
        let mut normalized: Vec<char> = Vec::with_capacity(keys.len());
        for c in keys.chars() {
            if !c.is_ascii_alphanumeric() {
                return Err(IsisError::Configuration(format!(
                    "invalid subfield key {c:?} in {keys:?}; keys must be in [a-z0-9]"
                )));
            }
            normalized.push(c.to_ascii_lowercase());
        }
        normalized.sort_unstable();
        normalized.dedup();
        let keys: String = normalized.into_iter().collect();

        let marker = if keys.is_empty() {
            None
        } else {
            let class: String = keys
                .chars()
                .flat_map(|c| [c, c.to_ascii_uppercase()])
                .collect();
            let pattern = format!(r"\^([{class}])");
            Some(Regex::new(&pattern).map_err(|e| IsisError::Configuration(e.to_string()))?)
        };

        Ok(SubfieldKeys { keys, marker })
    }

    /// Whether `key` is recognized by this set.
    #[must_use]
    pub fn contains(&self, key: char) -> bool {
        self.keys.contains(key.to_ascii_lowercase())
    }

    /// Whether the set recognizes no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The recognized keys, sorted.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.keys
    }
}

impl PartialEq for SubfieldKeys {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for SubfieldKeys {}

impl fmt::Display for SubfieldKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys)
    }
}

impl Serialize for SubfieldKeys {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.keys)
    }
}

/// Put a space after each doubled delimiter not already followed by whitespace.
///
/// `John Tenniel^^illustrator` would otherwise read as an `^i` subfield holding
/// `llustrator`. Keeping the pair together makes such data easy to find later.
fn normalize_doubled_delimiters(raw: &str) -> Cow<'_, str> {
    if !raw.contains(DOUBLED_DELIMITER) {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len() + 4);
    let mut rest = raw;
    while let Some(pos) = rest.find(DOUBLED_DELIMITER) {
        let end = pos + DOUBLED_DELIMITER.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];
        if !rest.starts_with(char::is_whitespace) {
            out.push(' ');
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Parse an ISIS field into its ordered subfields.
///
/// With `keys` of `None` every `^k` marker with `k` in `[a-z0-9]`
/// (case-insensitive) starts a new subfield. With `Some(keys)` only the
/// listed keys do; an empty key set returns the input verbatim as the main
/// subfield. Trailing whitespace is stripped from each segment.
///
/// # Examples
///
/// ```
/// use isisdm::subfield::{parse, Subfield, SubfieldKeys};
///
/// assert_eq!(parse("", None), vec![Subfield::main("")]);
///
/// let keys = SubfieldKeys::new("r").unwrap();
/// assert_eq!(
///     parse("John Tenniel^xillustrator", Some(&keys)),
///     vec![Subfield::main("John Tenniel^xillustrator")]
/// );
/// ```
#[must_use]
pub fn parse(raw: &str, keys: Option<&SubfieldKeys>) -> Vec<Subfield> {
    let marker = match keys {
        None => &*SUBFIELD_MARKER,
        Some(keys) => match &keys.marker {
            Some(marker) => marker,
            None => return vec![Subfield::main(raw)],
        },
    };

    let content = normalize_doubled_delimiters(raw);
    let mut subfields = Vec::new();
    let mut key = MAIN_SUBFIELD_KEY;
    let mut start = 0;

    for caps in marker.captures_iter(&content) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        subfields.push(Subfield::new(key, content[start..whole.start()].trim_end()));
        key = code
            .as_str()
            .chars()
            .next()
            .map_or(MAIN_SUBFIELD_KEY, |c| c.to_ascii_lowercase());
        start = whole.end();
    }
    subfields.push(Subfield::new(key, content[start..].trim_end()));

    subfields
}

/// Serialize subfields back into ISIS notation.
///
/// The main subfield is written as bare text; every other subfield is written
/// as `^` followed by its key and text.
#[must_use]
pub fn serialize(subfields: &[Subfield]) -> String {
    let capacity = subfields.iter().map(|s| s.value.len() + 2).sum();
    let mut out = String::with_capacity(capacity);
    for subfield in subfields {
        if !subfield.is_main() {
            out.push(SUBFIELD_DELIMITER);
            out.push(subfield.key);
        }
        out.push_str(&subfield.value);
    }
    out
}
