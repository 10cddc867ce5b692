//! Checked field kinds, descriptors and values.
//!
//! A record type declares its fields as [`FieldDescriptor`]s. Each descriptor
//! has a [`FieldKind`] that decides how raw input ([`FieldInput`]) is checked
//! and turned into a typed [`FieldValue`], and how that value is written to
//! the storage structure.
//!
//! | Kind | Accepts | Stored as |
//! |---|---|---|
//! | `Text` | text | string |
//! | `MultiText` | list of text | array of strings |
//! | `CompositeText` | ISIS string or `[key, value]` pairs | array of pairs |
//! | `MultiCompositeText` | list of the above | array of pair arrays |
//! | `Boolean` | bool | bool |
//! | `File` | named byte content | `{"filename", "digest"}` |
//! | `Reference` | non-empty identity token | string |

use crate::composite::CompositeField;
use crate::error::{IsisError, Result};
use crate::subfield::SubfieldKeys;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Per-field validator, run on every value before it is stored.
///
/// Validators run after the kind's type check and receive the coerced
/// [`FieldValue`], never the raw input: a `Boolean` validator sees
/// `FieldValue::Boolean`, a composite validator sees parsed subfields.
///
/// Returning `Err(message)` rejects the value and leaves the record unchanged.
pub type Validator = fn(&FieldDescriptor, &FieldValue) -> std::result::Result<(), String>;

/// The kind of a declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Single text value
    Text,
    /// Ordered list of text values
    MultiText,
    /// ISIS composite value
    CompositeText {
        /// Recognized subfield keys, or `None` for any `[a-z0-9]`
        subkeys: Option<SubfieldKeys>,
    },
    /// Ordered list of ISIS composite values
    MultiCompositeText {
        /// Recognized subfield keys, or `None` for any `[a-z0-9]`
        subkeys: Option<SubfieldKeys>,
    },
    /// Boolean flag
    Boolean,
    /// Binary attachment
    File,
    /// Identity of another stored document
    Reference,
}

impl FieldKind {
    /// Short name used in schema descriptions.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::MultiText => "multi_text",
            FieldKind::CompositeText { .. } => "composite_text",
            FieldKind::MultiCompositeText { .. } => "multi_composite_text",
            FieldKind::Boolean => "boolean",
            FieldKind::File => "file",
            FieldKind::Reference => "reference",
        }
    }

    /// Whether values of this kind are lists.
    #[must_use]
    pub const fn is_repeatable(&self) -> bool {
        matches!(
            self,
            FieldKind::MultiText | FieldKind::MultiCompositeText { .. }
        )
    }

    /// Recognized subfield keys of composite kinds.
    #[must_use]
    pub fn subkeys(&self) -> Option<&SubfieldKeys> {
        match self {
            FieldKind::CompositeText { subkeys } | FieldKind::MultiCompositeText { subkeys } => {
                subkeys.as_ref()
            },
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One allowed value of a choice-constrained field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Stored value
    pub value: String,
    /// Label shown to users
    pub label: String,
}

/// Declaration of a single field on a record type.
///
/// Descriptors are built with the constructor for their kind and refined with
/// the chained setters, then handed to a [`SchemaBuilder`](crate::SchemaBuilder),
/// which assigns the declaration order and checks the declaration.
///
/// ```
/// use isisdm::FieldDescriptor;
///
/// let authors = FieldDescriptor::multi_composite_text("authors")
///     .subkeys("fl")
///     .required();
/// assert!(authors.is_required());
/// assert_eq!(authors.kind().subkeys().unwrap().as_str(), "fl");
/// ```
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    order: usize,
    kind: FieldKind,
    required: bool,
    validator: Option<Validator>,
    choices: Vec<Choice>,
    declaration_error: Option<String>,
}

impl FieldDescriptor {
    /// Declare a field of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDescriptor {
            name: name.into(),
            order: 0,
            kind,
            required: false,
            validator: None,
            choices: Vec::new(),
            declaration_error: None,
        }
    }

    /// Declare a text field.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// Declare a repeated text field.
    #[must_use]
    pub fn multi_text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::MultiText)
    }

    /// Declare a composite text field.
    #[must_use]
    pub fn composite_text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::CompositeText { subkeys: None })
    }

    /// Declare a repeated composite text field.
    #[must_use]
    pub fn multi_composite_text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::MultiCompositeText { subkeys: None })
    }

    /// Declare a boolean field.
    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Declare a file field.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::File)
    }

    /// Declare a reference field.
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Reference)
    }

    /// Mark the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Restrict the field to a finite set of `(value, label)` choices.
    #[must_use]
    pub fn choices<I, V, L>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        self.choices = choices
            .into_iter()
            .map(|(value, label)| Choice {
                value: value.into(),
                label: label.into(),
            })
            .collect();
        self
    }

    /// Restrict a composite field to the given subfield keys.
    ///
    /// Invalid keys, or keys on a non-composite field, are reported when the
    /// schema is built.
    #[must_use]
    pub fn subkeys(mut self, keys: &str) -> Self {
        let parsed = match SubfieldKeys::new(keys) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.declaration_error = Some(e.to_string());
                return self;
            },
        };
        match &mut self.kind {
            FieldKind::CompositeText { subkeys } | FieldKind::MultiCompositeText { subkeys } => {
                *subkeys = Some(parsed);
            },
            other => {
                self.declaration_error = Some(format!("{other} fields take no subfield keys"));
            },
        }
        self
    }

    pub(crate) fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub(crate) fn declaration_error(&self) -> Option<&str> {
        self.declaration_error.as_deref()
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration position within the record type.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Field kind.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether the field must be present on every record.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Allowed choices; empty when unconstrained.
    #[must_use]
    pub fn allowed_choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Whether `value` is one of the declared choices (always true when unconstrained).
    #[must_use]
    pub fn accepts_choice(&self, value: &str) -> bool {
        self.choices.is_empty() || self.choices.iter().any(|c| c.value == value)
    }

    /// Check `input` against this field and produce the value to store.
    ///
    /// The kind's type check runs first, then the validator, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::Validation`] if the input has the wrong shape,
    /// breaks a content rule, or is rejected by the validator, and
    /// [`IsisError::InvalidInput`] for malformed composite structures.
    pub fn accept(&self, input: FieldInput) -> Result<FieldValue> {
        let value = self.coerce(input)?;
        self.run_validator(&value)?;
        Ok(value)
    }

    pub(crate) fn run_validator(&self, value: &FieldValue) -> Result<()> {
        match self.validator {
            Some(validator) => {
                validator(self, value).map_err(|message| IsisError::validation(&self.name, message))
            },
            None => Ok(()),
        }
    }

    fn coerce(&self, input: FieldInput) -> Result<FieldValue> {
        match &self.kind {
            FieldKind::Text => {
                let text = self.expect_text(input)?;
                if self.required && text.trim_end().is_empty() {
                    return Err(IsisError::validation(&self.name, "value cannot be empty"));
                }
                Ok(FieldValue::Text(text))
            },
            FieldKind::MultiText => match input {
                FieldInput::TextList(items) => Ok(FieldValue::MultiText(items)),
                FieldInput::Structure(Value::Array(items)) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s),
                        other => Err(IsisError::validation(
                            &self.name,
                            format!("list items must be text, got {other}"),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(FieldValue::MultiText),
                other => Err(self.shape_error("a sequence of text", &other)),
            },
            FieldKind::CompositeText { subkeys } => match input {
                FieldInput::Text(raw) => Ok(FieldValue::Composite(CompositeField::parse(
                    &raw,
                    subkeys.as_ref(),
                ))),
                FieldInput::Structure(value @ (Value::String(_) | Value::Array(_))) => {
                    CompositeField::from_value(&value, subkeys.as_ref()).map(FieldValue::Composite)
                },
                other => Err(self.shape_error("composite text", &other)),
            },
            FieldKind::MultiCompositeText { subkeys } => match input {
                FieldInput::TextList(items) => Ok(FieldValue::MultiComposite(
                    items
                        .iter()
                        .map(|raw| CompositeField::parse(raw, subkeys.as_ref()))
                        .collect(),
                )),
                FieldInput::Structure(Value::Array(items)) => items
                    .iter()
                    .map(|item| CompositeField::from_value(item, subkeys.as_ref()))
                    .collect::<Result<Vec<_>>>()
                    .map(FieldValue::MultiComposite),
                other => Err(self.shape_error("a sequence of composite text", &other)),
            },
            FieldKind::Boolean => match input {
                FieldInput::Bool(flag) | FieldInput::Structure(Value::Bool(flag)) => {
                    Ok(FieldValue::Boolean(flag))
                },
                other => Err(self.shape_error("a boolean", &other)),
            },
            FieldKind::File => match input {
                FieldInput::File(file) => {
                    if file.content.is_none() {
                        return Err(IsisError::validation(&self.name, "file has no content"));
                    }
                    if file.filename.trim().is_empty() {
                        return Err(IsisError::validation(&self.name, "file has no filename"));
                    }
                    Ok(FieldValue::File(file))
                },
                FieldInput::Structure(value @ Value::Object(_)) => FileValue::from_value(&value)
                    .map(FieldValue::File)
                    .map_err(|e| IsisError::validation(&self.name, e.to_string())),
                other => Err(self.shape_error("a file", &other)),
            },
            FieldKind::Reference => {
                let token = self.expect_text(input)?;
                if token.is_empty() {
                    return Err(IsisError::validation(&self.name, "reference cannot be empty"));
                }
                if self.required && token.trim().is_empty() {
                    return Err(IsisError::validation(&self.name, "reference cannot be blank"));
                }
                Ok(FieldValue::Reference(token))
            },
        }
    }

    fn expect_text(&self, input: FieldInput) -> Result<String> {
        match input {
            FieldInput::Text(text) | FieldInput::Structure(Value::String(text)) => Ok(text),
            other => Err(self.shape_error("text", &other)),
        }
    }

    fn shape_error(&self, expected: &str, got: &FieldInput) -> IsisError {
        IsisError::validation(
            &self.name,
            format!("value must be {expected}, got {}", got.describe()),
        )
    }

    /// Describe this field for a form-rendering layer.
    #[must_use]
    pub fn describe(&self, hidden: bool) -> FieldSchema {
        FieldSchema {
            name: self.name.clone(),
            kind: self.kind.name(),
            required: self.required,
            repeatable: self.kind.is_repeatable(),
            choices: self.choices.clone(),
            subkeys: self.kind.subkeys().map(ToString::to_string),
            hidden,
        }
    }
}

/// External description of a field, enough to build an input widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    /// Field name
    pub name: String,
    /// Kind name, see [`FieldKind::name`]
    pub kind: &'static str,
    /// Whether a value is mandatory
    pub required: bool,
    /// Whether the value is a list
    pub repeatable: bool,
    /// Allowed choices; empty when unconstrained
    pub choices: Vec<Choice>,
    /// Recognized subfield keys of composite fields
    pub subkeys: Option<String>,
    /// Whether the field is a hidden (control) field
    pub hidden: bool,
}

/// A binary attachment value.
///
/// The content travels out-of-band: the storage structure only carries the
/// filename and the SHA-256 digest. A value loaded from a store therefore has
/// no content. Equality compares filename and digest.
#[derive(Debug, Clone)]
pub struct FileValue {
    filename: String,
    digest: String,
    content: Option<Bytes>,
}

impl FileValue {
    /// Wrap in-memory content under the given filename.
    #[must_use]
    pub fn from_bytes(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        FileValue {
            filename: filename.into(),
            digest: content_digest(&content),
            content: Some(content),
        }
    }

    /// Read a file, naming the attachment after the file's own name.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::IoError`] if the file cannot be read, or
    /// [`IsisError::InvalidInput`] if the path has no file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                IsisError::InvalidInput(format!("{} has no file name", path.display()))
            })?;
        Self::from_path_named(path, filename)
    }

    /// Read a file, storing it under an explicit filename.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::IoError`] if the file cannot be read.
    pub fn from_path_named(path: impl AsRef<Path>, filename: impl Into<String>) -> Result<Self> {
        let content = std::fs::read(path)?;
        Ok(Self::from_bytes(filename, content))
    }

    /// Rebuild a content-less value from its storage form.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::InvalidInput`] unless `value` is an object with
    /// string `filename` and `digest` entries.
    pub fn from_value(value: &Value) -> Result<Self> {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| IsisError::InvalidInput(format!("file entry needs a '{key}' string")))
        };
        Ok(FileValue {
            filename: text("filename")?,
            digest: text("digest")?,
            content: None,
        })
    }

    /// Storage form: `{"filename": …, "digest": …}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "filename": self.filename, "digest": self.digest })
    }

    /// Attachment filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Lowercase hex SHA-256 of the content.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Content bytes, when carried.
    #[must_use]
    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }
}

impl PartialEq for FileValue {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename && self.digest == other.digest
    }
}

impl Eq for FileValue {}

/// Lowercase hex SHA-256 of `content`.
#[must_use]
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// A checked field value held by a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Text
    Text(String),
    /// List of text
    MultiText(Vec<String>),
    /// Composite text
    Composite(CompositeField),
    /// List of composite text
    MultiComposite(Vec<CompositeField>),
    /// Boolean
    Boolean(bool),
    /// Attachment
    File(FileValue),
    /// Foreign document identity
    Reference(String),
}

impl FieldValue {
    /// Storage form of this value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::Text(text) | FieldValue::Reference(text) => Value::String(text.clone()),
            FieldValue::MultiText(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            },
            FieldValue::Composite(field) => field.to_value(),
            FieldValue::MultiComposite(fields) => {
                Value::Array(fields.iter().map(CompositeField::to_value).collect())
            },
            FieldValue::Boolean(flag) => Value::Bool(*flag),
            FieldValue::File(file) => file.to_value(),
        }
    }

    /// Text or reference token.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) | FieldValue::Reference(text) => Some(text),
            _ => None,
        }
    }

    /// Items of a repeated text value.
    #[must_use]
    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            FieldValue::MultiText(items) => Some(items),
            _ => None,
        }
    }

    /// Composite value.
    #[must_use]
    pub fn as_composite(&self) -> Option<&CompositeField> {
        match self {
            FieldValue::Composite(field) => Some(field),
            _ => None,
        }
    }

    /// Items of a repeated composite value.
    #[must_use]
    pub fn as_composites(&self) -> Option<&[CompositeField]> {
        match self {
            FieldValue::MultiComposite(fields) => Some(fields),
            _ => None,
        }
    }

    /// Boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Attachment value.
    #[must_use]
    pub fn as_file(&self) -> Option<&FileValue> {
        match self {
            FieldValue::File(file) => Some(file),
            _ => None,
        }
    }
}

/// Raw input for a field, before checking.
///
/// Most callers rely on the `From` conversions: `&str`/`String` for text,
/// `Vec<_>` of text for lists, `bool`, [`FileValue`], and
/// [`serde_json::Value`] for values coming out of a storage structure.
#[derive(Debug, Clone)]
pub enum FieldInput {
    /// Text
    Text(String),
    /// List of text
    TextList(Vec<String>),
    /// Boolean
    Bool(bool),
    /// Attachment with content
    File(FileValue),
    /// Storage-structure value
    Structure(Value),
}

impl FieldInput {
    fn describe(&self) -> String {
        match self {
            FieldInput::Text(_) => "text".to_string(),
            FieldInput::TextList(_) => "a list of text".to_string(),
            FieldInput::Bool(_) => "a boolean".to_string(),
            FieldInput::File(_) => "a file".to_string(),
            FieldInput::Structure(value) => value.to_string(),
        }
    }
}

impl From<&str> for FieldInput {
    fn from(text: &str) -> Self {
        FieldInput::Text(text.to_string())
    }
}

impl From<String> for FieldInput {
    fn from(text: String) -> Self {
        FieldInput::Text(text)
    }
}

impl From<Vec<String>> for FieldInput {
    fn from(items: Vec<String>) -> Self {
        FieldInput::TextList(items)
    }
}

impl From<Vec<&str>> for FieldInput {
    fn from(items: Vec<&str>) -> Self {
        FieldInput::TextList(items.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldInput {
    fn from(items: [&str; N]) -> Self {
        FieldInput::TextList(items.iter().map(|s| (*s).to_string()).collect())
    }
}

impl From<bool> for FieldInput {
    fn from(flag: bool) -> Self {
        FieldInput::Bool(flag)
    }
}

impl From<FileValue> for FieldInput {
    fn from(file: FileValue) -> Self {
        FieldInput::File(file)
    }
}

impl From<CompositeField> for FieldInput {
    fn from(field: CompositeField) -> Self {
        FieldInput::Structure(field.to_value())
    }
}

impl From<Value> for FieldInput {
    fn from(value: Value) -> Self {
        FieldInput::Structure(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_banana(_: &FieldDescriptor, value: &FieldValue) -> std::result::Result<(), String> {
        match value.as_text() {
            Some(text) if text.starts_with("Banana") => {
                Err("You can't start a text with 'Banana'".to_string())
            },
            _ => Ok(()),
        }
    }

    #[test]
    fn test_text_accepts_text() {
        let title = FieldDescriptor::text("title");
        let value = title.accept("Godel, Escher, Bach".into()).unwrap();
        assert_eq!(value.as_text(), Some("Godel, Escher, Bach"));
        assert_eq!(value.to_value(), json!("Godel, Escher, Bach"));
    }

    #[test]
    fn test_text_rejects_non_text() {
        let title = FieldDescriptor::text("title");
        let err = title.accept(true.into()).unwrap_err();
        assert!(matches!(err, IsisError::Validation { ref field, .. } if field == "title"));
    }

    #[test]
    fn test_required_text_rejects_blank() {
        let title = FieldDescriptor::text("title").required();
        assert!(title.accept("   ".into()).is_err());
        assert!(FieldDescriptor::text("pages").accept("   ".into()).is_ok());
    }

    #[test]
    fn test_validator_runs() {
        let title = FieldDescriptor::text("title").validator(no_banana);
        assert!(title.accept("Apple pie".into()).is_ok());
        let err = title.accept("Banana split".into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for field 'title': You can't start a text with 'Banana'"
        );
    }

    #[test]
    fn test_multi_text() {
        let authors = FieldDescriptor::multi_text("authors");
        let value = authors.accept(vec!["Hofstadter, Douglas"].into()).unwrap();
        assert_eq!(value.as_texts().unwrap(), ["Hofstadter, Douglas".to_string()]);
        assert!(authors.accept("Hofstadter, Douglas".into()).is_err());
        assert!(authors.accept(json!(["a", 1]).into()).is_err());
    }

    #[test]
    fn test_composite_text_uses_subkeys() {
        let authors = FieldDescriptor::composite_text("authors").subkeys("fl");
        let value = authors.accept("^lGrier^fDavid^xignored".into()).unwrap();
        let composite = value.as_composite().unwrap();
        assert_eq!(composite.get('f').unwrap(), "David^xignored");
        assert_eq!(composite.get('l').unwrap(), "Grier");
    }

    #[test]
    fn test_composite_from_structure() {
        let authors = FieldDescriptor::composite_text("authors");
        let value = authors
            .accept(json!([["_", ""], ["l", "Grier"]]).into())
            .unwrap();
        assert_eq!(value.as_composite().unwrap().to_string(), "^lGrier");
        assert!(matches!(
            authors.accept(json!([["_", "", "x"]]).into()),
            Err(IsisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_multi_composite_text() {
        let authors = FieldDescriptor::multi_composite_text("authors").subkeys("fl");
        let value = authors
            .accept(["^lGreene^fLewis Joel", "^lRodrigues^fJose Antunes"].into())
            .unwrap();
        let fields = value.as_composites().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].get('f').unwrap(), "Lewis Joel");
        assert_eq!(fields[1].get('l').unwrap(), "Rodrigues");
    }

    #[test]
    fn test_boolean() {
        let flag = FieldDescriptor::boolean("active");
        assert_eq!(flag.accept(true.into()).unwrap().as_bool(), Some(true));
        assert_eq!(flag.accept(json!(false).into()).unwrap().as_bool(), Some(false));
        assert!(flag.accept("true".into()).is_err());
    }

    #[test]
    fn test_reference() {
        let collection = FieldDescriptor::reference("collection");
        assert_eq!(
            collection.accept("123abc".into()).unwrap().as_text(),
            Some("123abc")
        );
        assert!(collection.accept("".into()).is_err());
        assert!(collection.accept(vec!["a", "b"].into()).is_err());
        assert!(collection.accept("  ".into()).is_ok());
        assert!(collection.required().accept("  ".into()).is_err());
    }

    #[test]
    fn test_file_value() {
        let file = FileValue::from_bytes("cover.png", b"fake png".to_vec());
        assert_eq!(file.digest(), content_digest(b"fake png"));
        assert_eq!(file.digest().len(), 64);

        let stored = file.to_value();
        let loaded = FileValue::from_value(&stored).unwrap();
        assert!(loaded.content().is_none());
        assert_eq!(loaded, file);
    }

    #[test]
    fn test_file_field_requires_content() {
        let cover = FieldDescriptor::file("cover");
        assert!(cover
            .accept(FileValue::from_bytes("cover.png", b"x".to_vec()).into())
            .is_ok());
        assert!(cover
            .accept(FileValue::from_bytes("", b"x".to_vec()).into())
            .is_err());

        let loaded = FileValue::from_bytes("cover.png", b"x".to_vec()).to_value();
        let stub = FileValue::from_value(&loaded).unwrap();
        assert!(cover.accept(FieldInput::File(stub)).is_err());
        assert!(cover.accept(loaded.into()).is_ok());
    }

    #[test]
    fn test_subkeys_on_wrong_kind_is_recorded() {
        let title = FieldDescriptor::text("title").subkeys("a");
        assert!(title.declaration_error().is_some());
        let bad = FieldDescriptor::composite_text("x").subkeys("!");
        assert!(bad.declaration_error().is_some());
    }

    #[test]
    fn test_choices() {
        let entry_type = FieldDescriptor::text("entry_type").choices([("book", "Book"), ("misc", "Misc")]);
        assert!(entry_type.accepts_choice("book"));
        assert!(!entry_type.accepts_choice("film"));
        assert!(FieldDescriptor::text("free").accepts_choice("anything"));
        assert_eq!(entry_type.allowed_choices()[0].value, "book");

        let schema = entry_type.describe(false);
        assert_eq!(schema.kind, "text");
        assert_eq!(schema.choices.len(), 2);
        assert_eq!(schema.choices[1].label, "Misc");
    }

    #[test]
    fn test_kind_is_repeatable() {
        assert!(FieldKind::MultiText.is_repeatable());
        assert!(FieldKind::MultiCompositeText { subkeys: None }.is_repeatable());
        assert!(!FieldKind::Text.is_repeatable());
        assert!(!FieldKind::File.is_repeatable());
    }

    fn needs_surname(_: &FieldDescriptor, value: &FieldValue) -> std::result::Result<(), String> {
        match value {
            FieldValue::Composite(author) if author.get_opt('l').is_some() => Ok(()),
            FieldValue::Composite(_) => Err("surname missing".to_string()),
            other => Err(format!("expected parsed subfields, got {other:?}")),
        }
    }

    #[test]
    fn test_validator_sees_coerced_value() {
        let author = FieldDescriptor::composite_text("author")
            .subkeys("fl")
            .validator(needs_surname);
        assert!(author.accept("^lGrier^fDavid".into()).is_ok());
        match author.accept("David Grier".into()) {
            Err(IsisError::Validation { field, message }) => {
                assert_eq!(field, "author");
                assert_eq!(message, "surname missing");
            },
            other => panic!("expected validation error, got {other:?}"),
        }
        // type check fails before the validator is reached
        assert!(matches!(
            author.accept(true.into()),
            Err(IsisError::Validation { message, .. }) if message != "surname missing"
        ));
    }
}
