//! Record instances and their storage structure.
//!
//! A [`Record`] holds checked values for the fields of one
//! [`RecordSchema`]. It is only ever observable in a valid state: the
//! constructor checks every supplied value and then that every required field
//! is present, and [`Record::set`] is all-or-nothing.
//!
//! [`Record::to_structure`] produces the flat, JSON-like mapping stored in a
//! document store; [`Record::from_structure`] reverses it after checking the
//! discriminator.
//!
//! # Examples
//!
//! ```
//! use isisdm::{FieldDescriptor, Record, RecordSchema};
//! use std::sync::Arc;
//!
//! let article = Arc::new(
//!     RecordSchema::builder("Article")
//!         .field(FieldDescriptor::text("title").required())
//!         .field(FieldDescriptor::composite_text("authors").subkeys("fl"))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let record = Record::new(
//!     Arc::clone(&article),
//!     [("title", "Too Soon To Tell"), ("authors", "^lGrier^fDavid")],
//! )
//! .unwrap();
//!
//! let authors = record.get("authors").and_then(|v| v.as_composite()).unwrap();
//! assert_eq!(authors.get('f').unwrap(), "David");
//!
//! let structure = record.to_structure();
//! assert_eq!(structure["TYPE"], "Article");
//! assert_eq!(Record::from_structure(article, &structure).unwrap(), record);
//! ```

use crate::error::{IsisError, Result};
use crate::field::{FieldDescriptor, FieldInput, FieldValue, FileValue};
use crate::schema::{
    is_control_key, RecordSchema, RecordType, DISCRIMINATOR_KEY, ID_KEY, REVISION_KEY,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Flat storage form of a record: string keys to JSON-like values.
pub type Structure = Map<String, Value>;

/// A runtime instance of a record type.
///
/// Values are kept in declaration order, one slot per declared field.
/// Equality compares the record type, every field value, and the stored
/// identity and revision.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    values: Vec<Option<FieldValue>>,
    identity: Option<String>,
    revision: Option<String>,
}

impl Record {
    /// Build a record from `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::UnknownField`] for names the type does not declare,
    /// any error of [`FieldDescriptor::accept`] for rejected values, and
    /// [`IsisError::MissingRequiredField`] if a required field is not supplied.
    pub fn new<I, K, V>(schema: Arc<RecordSchema>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldInput>,
    {
        let mut record = Record {
            values: vec![None; schema.len()],
            schema,
            identity: None,
            revision: None,
        };
        for (name, value) in values {
            record.set(name.as_ref(), value)?;
        }
        record.validate()?;
        Ok(record)
    }

    /// Build a record of a statically registered type.
    ///
    /// # Errors
    ///
    /// See [`Record::new`].
    pub fn of<T: RecordType>(
        values: impl IntoIterator<Item = (impl AsRef<str>, impl Into<FieldInput>)>,
    ) -> Result<Self> {
        Record::new(T::schema(), values)
    }

    /// Check and store a single field value.
    ///
    /// On error the previous value, if any, is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::UnknownField`] for undeclared names, any error
    /// of [`FieldDescriptor::accept`], and [`IsisError::Validation`] for a
    /// file whose filename another file field already uses.
    pub fn set(&mut self, name: &str, value: impl Into<FieldInput>) -> Result<()> {
        let (position, descriptor) = self.descriptor(name)?;
        let value = descriptor.accept(value.into())?;
        if let Some(file) = value.as_file() {
            self.check_filename(position, name, file)?;
        }
        self.values[position] = Some(value);
        Ok(())
    }

    /// Attachments are stored by filename, so two file fields cannot share one.
    fn check_filename(&self, position: usize, name: &str, file: &FileValue) -> Result<()> {
        for (other, (descriptor, value)) in self.schema.fields().zip(&self.values).enumerate() {
            if other == position {
                continue;
            }
            if let Some(FieldValue::File(existing)) = value {
                if existing.filename() == file.filename() {
                    return Err(IsisError::validation(
                        name,
                        format!(
                            "filename '{}' is already used by field '{}'",
                            file.filename(),
                            descriptor.name()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Remove an optional field's value.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::UnknownField`] for undeclared names and
    /// [`IsisError::MissingRequiredField`] for required fields.
    pub fn clear(&mut self, name: &str) -> Result<()> {
        let (position, descriptor) = self.descriptor(name)?;
        if descriptor.is_required() {
            return Err(IsisError::MissingRequiredField(name.to_string()));
        }
        self.values[position] = None;
        Ok(())
    }

    fn descriptor(&self, name: &str) -> Result<(usize, &FieldDescriptor)> {
        self.schema
            .position(name)
            .zip(self.schema.field(name))
            .ok_or_else(|| IsisError::UnknownField {
                record_type: self.schema.type_name().to_string(),
                field: name.to_string(),
            })
    }

    /// Check that every required field is present and re-run the validators.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::MissingRequiredField`] naming the first absent
    /// required field, or the first validator failure.
    pub fn validate(&self) -> Result<()> {
        for (descriptor, value) in self.schema.fields().zip(&self.values) {
            match value {
                None if descriptor.is_required() => {
                    return Err(IsisError::MissingRequiredField(
                        descriptor.name().to_string(),
                    ));
                },
                None => {},
                Some(value) => descriptor.run_validator(value)?,
            }
        }
        Ok(())
    }

    /// Value of a field, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .position(name)
            .and_then(|position| self.values[position].as_ref())
    }

    /// Text value of a text or reference field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Set fields as `(name, value)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.schema
            .fields()
            .zip(&self.values)
            .filter_map(|(descriptor, value)| value.as_ref().map(|v| (descriptor.name(), v)))
    }

    /// Set file fields as `(name, file)` in declaration order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileValue)> + '_ {
        self.iter()
            .filter_map(|(name, value)| value.as_file().map(|file| (name, file)))
    }

    /// Schema of this record's type.
    #[must_use]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Name of this record's type.
    #[must_use]
    pub fn record_type(&self) -> &str {
        self.schema.type_name()
    }

    /// Document identity, once assigned.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Revision token of the last stored version.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Point this record at an existing document, e.g. to save an edit.
    ///
    /// Saving with an identity and a revision updates that document; with an
    /// identity alone it inserts under that identity.
    pub fn set_identity(&mut self, identity: impl Into<String>, revision: Option<String>) {
        self.identity = Some(identity.into());
        self.revision = revision;
    }

    pub(crate) fn mark_saved(&mut self, identity: String, revision: String) {
        self.identity = Some(identity);
        self.revision = Some(revision);
    }

    /// Storage structure: the discriminator, identity and revision when
    /// known, then each set field's storage form in declaration order.
    #[must_use]
    pub fn to_structure(&self) -> Structure {
        let mut structure = Structure::new();
        structure.insert(
            DISCRIMINATOR_KEY.to_string(),
            Value::String(self.schema.type_name().to_string()),
        );
        if let Some(identity) = &self.identity {
            structure.insert(ID_KEY.to_string(), Value::String(identity.clone()));
        }
        if let Some(revision) = &self.revision {
            structure.insert(REVISION_KEY.to_string(), Value::String(revision.clone()));
        }
        for (name, value) in self.iter() {
            structure.insert(name.to_string(), value.to_value());
        }
        structure
    }

    /// Rebuild a record from its storage structure.
    ///
    /// Control keys (the discriminator, and any key starting with `_` other
    /// than the identity and revision) are stripped; `null` values count as
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::InvalidInput`] if the discriminator, identity or
    /// revision is missing or not text, [`IsisError::TypeMismatch`] if the
    /// discriminator names another type, and any error of [`Record::new`].
    pub fn from_structure(schema: Arc<RecordSchema>, structure: &Structure) -> Result<Self> {
        let found = match structure.get(DISCRIMINATOR_KEY) {
            Some(Value::String(found)) => found,
            Some(other) => {
                return Err(IsisError::InvalidInput(format!(
                    "'{DISCRIMINATOR_KEY}' must be text, got {other}"
                )))
            },
            None => {
                return Err(IsisError::InvalidInput(format!(
                    "structure has no '{DISCRIMINATOR_KEY}' key"
                )))
            },
        };
        if found != schema.type_name() {
            return Err(IsisError::TypeMismatch {
                expected: schema.type_name().to_string(),
                found: found.clone(),
            });
        }

        let identity = control_text(structure, ID_KEY)?;
        let revision = control_text(structure, REVISION_KEY)?;

        let values = structure
            .iter()
            .filter(|(key, value)| !is_control_key(key) && !value.is_null())
            .map(|(key, value)| (key.as_str(), FieldInput::Structure(value.clone())));

        let mut record = Record::new(schema, values)?;
        record.identity = identity;
        record.revision = revision;
        Ok(record)
    }

    /// [`Record::from_structure`] for a statically registered type.
    ///
    /// # Errors
    ///
    /// See [`Record::from_structure`].
    pub fn from_structure_as<T: RecordType>(structure: &Structure) -> Result<Self> {
        Record::from_structure(T::schema(), structure)
    }
}

fn control_text(structure: &Structure, key: &str) -> Result<Option<String>> {
    match structure.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(IsisError::InvalidInput(format!(
            "'{key}' must be text, got {other}"
        ))),
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.type_name() == other.schema.type_name()
            && self.values == other.values
            && self.identity == other.identity
            && self.revision == other.revision
    }
}

impl Eq for Record {}
