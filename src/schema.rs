//! Record type schemas: ordered field declarations and their projection.
//!
//! A [`RecordSchema`] is the immutable, ordered list of fields a record type
//! declares. It is built once with a [`SchemaBuilder`], which assigns each
//! field its declaration position and rejects misuse up front, and then
//! shared read-only by every record of that type.
//!
//! # Examples
//!
//! ```
//! use isisdm::{FieldDescriptor, RecordSchema};
//!
//! let book = RecordSchema::builder("Book")
//!     .field(FieldDescriptor::text("title").required())
//!     .field(FieldDescriptor::multi_text("authors"))
//!     .field(FieldDescriptor::text("pages"))
//!     .build()
//!     .unwrap();
//!
//! let names: Vec<&str> = book.fields().map(|f| f.name()).collect();
//! assert_eq!(names, ["title", "authors", "pages"]);
//! ```

use crate::error::{IsisError, Result};
use crate::field::{FieldDescriptor, FieldSchema};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

/// Structure key holding the record type name.
pub const DISCRIMINATOR_KEY: &str = "TYPE";

/// Structure key holding the document identity.
pub const ID_KEY: &str = "_id";

/// Structure key holding the document revision token.
pub const REVISION_KEY: &str = "_rev";

/// Structure key holding attachment metadata.
pub const ATTACHMENTS_KEY: &str = "_attachments";

/// Whether `name` is a key the mapper or the store reserves for itself.
#[must_use]
pub fn is_control_key(name: &str) -> bool {
    name == DISCRIMINATOR_KEY || name.starts_with('_')
}

/// A record type: its name and its fields in declaration order.
#[derive(Debug)]
pub struct RecordSchema {
    type_name: String,
    fields: IndexMap<String, FieldDescriptor>,
    hidden: IndexSet<String>,
}

impl RecordSchema {
    /// Start declaring a record type.
    #[must_use]
    pub fn builder(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            type_name: type_name.into(),
            fields: Vec::new(),
            hidden: Vec::new(),
        }
    }

    /// Record type name, stored under [`DISCRIMINATOR_KEY`].
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Whether the type declares a field called `name`.
    #[must_use]
    pub fn is_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Whether `name` is declared hidden.
    #[must_use]
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the type declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    /// Describe the fields for a form-rendering layer.
    ///
    /// Hidden fields are left out unless `include_control_fields` is set.
    #[must_use]
    pub fn describe(&self, include_control_fields: bool) -> Vec<FieldSchema> {
        self.fields()
            .filter_map(|field| {
                let hidden = self.is_hidden(field.name());
                (include_control_fields || !hidden).then(|| field.describe(hidden))
            })
            .collect()
    }
}

/// Collects field declarations for a [`RecordSchema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    type_name: String,
    fields: Vec<FieldDescriptor>,
    hidden: Vec<String>,
}

impl SchemaBuilder {
    /// Declare the next field. Fields keep the order in which they are declared.
    #[must_use]
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Mark a declared field as hidden from schema projection.
    ///
    /// Hidden fields are still validated and stored.
    #[must_use]
    pub fn hidden(mut self, name: impl Into<String>) -> Self {
        self.hidden.push(name.into());
        self
    }

    /// Check the declarations and freeze the schema.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::Configuration`] if the type name is empty, a field
    /// name is empty, duplicated or reserved (the discriminator key or any name
    /// starting with `_`), a field declaration is invalid, or a hidden name is
    /// not a declared field.
    pub fn build(self) -> Result<RecordSchema> {
        let type_name = self.type_name;
        if type_name.trim().is_empty() {
            return Err(IsisError::Configuration(
                "record type name cannot be empty".to_string(),
            ));
        }

        let mut fields = IndexMap::with_capacity(self.fields.len());
        for (order, descriptor) in self.fields.into_iter().enumerate() {
            let name = descriptor.name().to_string();
            if name.is_empty() {
                return Err(IsisError::Configuration(format!(
                    "{type_name}: field #{order} has an empty name"
                )));
            }
            if is_control_key(&name) {
                return Err(IsisError::Configuration(format!(
                    "{type_name}: '{name}' is a reserved identifier"
                )));
            }
            if let Some(problem) = descriptor.declaration_error() {
                return Err(IsisError::Configuration(format!(
                    "{type_name}.{name}: {problem}"
                )));
            }
            if fields.contains_key(&name) {
                return Err(IsisError::Configuration(format!(
                    "{type_name}: field '{name}' declared twice"
                )));
            }
            fields.insert(name, descriptor.with_order(order));
        }

        let mut hidden = IndexSet::with_capacity(self.hidden.len());
        for name in self.hidden {
            if !fields.contains_key(&name) {
                return Err(IsisError::Configuration(format!(
                    "{type_name}: hidden field '{name}' is not declared"
                )));
            }
            hidden.insert(name);
        }

        Ok(RecordSchema {
            type_name,
            fields,
            hidden,
        })
    }
}

/// A statically registered record type.
///
/// Usually implemented through the [`record_type!`](crate::record_type) macro.
pub trait RecordType {
    /// The process-wide schema of this type.
    fn schema() -> Arc<RecordSchema>;
}

/// Ordered field descriptors of a record type.
#[must_use]
pub fn fields_of<T: RecordType>() -> Vec<FieldDescriptor> {
    T::schema().fields().cloned().collect()
}

/// Whether record type `T` declares a field called `name`.
#[must_use]
pub fn is_field<T: RecordType>(name: &str) -> bool {
    T::schema().is_field(name)
}

/// Schema projection of record type `T`; see [`RecordSchema::describe`].
#[must_use]
pub fn schema_of<T: RecordType>(include_control_fields: bool) -> Vec<FieldSchema> {
    T::schema().describe(include_control_fields)
}
