//! Composite field values built from ISIS subfield notation.
//!
//! A [`CompositeField`] is the typed form of a string such as
//! `^lGrier^fDavid`: an ordered list of subfields with key-indexed lookups.
//! It can be built from the raw string or from already-structured pairs
//! (as loaded from a document store), and converts back to either form.
//!
//! # Examples
//!
//! ```
//! use isisdm::CompositeField;
//!
//! let author = CompositeField::parse("^lGrier^fDavid", None);
//! assert_eq!(author.get('f').unwrap(), "David");
//! assert!(author.get('j').is_err());
//! assert_eq!(author.to_string(), "^lGrier^fDavid");
//! ```

use crate::error::{IsisError, Result};
use crate::subfield::{self, is_valid_key, Subfield, SubfieldKeys, MAIN_SUBFIELD_KEY};
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;

/// A field value holding labeled subfields.
///
/// Exactly one main (`_`) subfield exists, always in first position.
/// Subfields are stored in a `SmallVec` since most fields carry four or fewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeField {
    subfields: SmallVec<[Subfield; 4]>,
}

impl CompositeField {
    /// Parse a raw ISIS string, honoring only `keys` when given.
    #[must_use]
    pub fn parse(raw: &str, keys: Option<&SubfieldKeys>) -> Self {
        CompositeField {
            subfields: subfield::parse(raw, keys).into_iter().collect(),
        }
    }

    /// Build from `(key, value)` pairs in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::InvalidInput`] if a key is not a single valid
    /// subfield character, or if the first pair is not the only main (`_`) pair.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut subfields = SmallVec::new();
        for (index, (key, value)) in pairs.into_iter().enumerate() {
            let key = single_key(key.as_ref())?;
            if (index == 0) != (key == MAIN_SUBFIELD_KEY) {
                return Err(IsisError::InvalidInput(format!(
                    "subfield '{MAIN_SUBFIELD_KEY}' must appear exactly once, first; found '{key}' at position {index}"
                )));
            }
            subfields.push(Subfield::new(key, value));
        }
        if subfields.is_empty() {
            return Err(IsisError::InvalidInput(
                "composite field needs at least the main subfield".to_string(),
            ));
        }
        Ok(CompositeField { subfields })
    }

    /// Build from a stored value: either a raw string or an array of
    /// two-element `[key, value]` string arrays.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::InvalidInput`] for any other shape.
    pub fn from_value(value: &Value, keys: Option<&SubfieldKeys>) -> Result<Self> {
        match value {
            Value::String(raw) => Ok(CompositeField::parse(raw, keys)),
            Value::Array(items) => {
                let pairs = items
                    .iter()
                    .map(|item| match item.as_array().map(Vec::as_slice) {
                        Some([Value::String(k), Value::String(v)]) => Ok((k.as_str(), v.as_str())),
                        _ => Err(IsisError::InvalidInput(format!(
                            "subfield entry must be a [key, value] pair of strings, got {item}"
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                CompositeField::from_pairs(pairs)
            },
            other => Err(IsisError::InvalidInput(format!(
                "composite value must be a string or a list of pairs, got {other}"
            ))),
        }
    }

    /// Text of the first subfield labeled `key`.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::KeyNotFound`] if no subfield has that key.
    pub fn get(&self, key: char) -> Result<&str> {
        self.get_opt(key).ok_or(IsisError::KeyNotFound(key))
    }

    /// Text of the first subfield labeled `key`, if any.
    #[must_use]
    pub fn get_opt(&self, key: char) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.subfields
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.value.as_str())
    }

    /// Text of the unlabeled leading subfield.
    #[must_use]
    pub fn main(&self) -> &str {
        self.subfields.first().map_or("", |s| s.value.as_str())
    }

    /// Subfield keys in order, main key first.
    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        self.subfields.iter().map(|s| s.key)
    }

    /// `(key, text)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> + '_ {
        self.subfields.iter().map(|s| (s.key, s.value.as_str()))
    }

    /// The underlying subfields.
    #[must_use]
    pub fn subfields(&self) -> &[Subfield] {
        &self.subfields
    }

    /// Number of subfields, main subfield included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subfields.len()
    }

    /// Always false: the main subfield is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subfields.is_empty()
    }

    /// Canonical `(key, text)` pairs for re-storage.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(char, String)> {
        self.subfields
            .iter()
            .map(|s| (s.key, s.value.clone()))
            .collect()
    }

    /// Storage form: an array of `[key, value]` arrays.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.subfields
                .iter()
                .map(|s| {
                    Value::Array(vec![
                        Value::String(s.key.to_string()),
                        Value::String(s.value.clone()),
                    ])
                })
                .collect(),
        )
    }
}

impl fmt::Display for CompositeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&subfield::serialize(&self.subfields))
    }
}

fn single_key(key: &str) -> Result<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if is_valid_key(c.to_ascii_lowercase()) => Ok(c.to_ascii_lowercase()),
        _ => Err(IsisError::InvalidInput(format!(
            "invalid subfield key {key:?}"
        ))),
    }
}
