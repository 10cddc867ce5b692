#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # isisdm: ISIS data model
//!
//! Typed records over the ISIS subfield convention, persisted in a
//! revisioned document store.
//!
//! ## Quick Start
//!
//! ### Reading composite fields
//!
//! ```
//! use isisdm::{CompositeField, SubfieldKeys};
//!
//! let keys = SubfieldKeys::new("fl").unwrap();
//! let author = CompositeField::parse("^lSilva^fJoao", Some(&keys));
//!
//! assert_eq!(author.get('l').unwrap(), "Silva");
//! assert_eq!(author.main(), "");
//! assert_eq!(author.to_string(), "^lSilva^fJoao");
//! ```
//!
//! ### Declaring and saving records
//!
//! ```
//! use isisdm::{record_type, DocumentMapper, FieldDescriptor, MemoryStore, Record};
//!
//! record_type! {
//!     struct Article {
//!         FieldDescriptor::text("title").required(),
//!         FieldDescriptor::multi_composite_text("authors").subkeys("fl"),
//!     }
//! }
//!
//! # fn main() -> isisdm::Result<()> {
//! let mapper = DocumentMapper::new(MemoryStore::new());
//! let mut article = Record::of::<Article>(vec![
//!     ("title", isisdm::FieldInput::from("Too Soon To Tell")),
//!     ("authors", vec!["^lGrier^fDavid"].into()),
//! ])?;
//!
//! let id = mapper.save(&mut article)?;
//! assert_eq!(mapper.get_as::<Article>(&id)?, article);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`subfield`] — Subfield codec for `^k`-delimited ISIS strings
//! - [`composite`] — Read-only keyed view over a parsed field value
//! - [`field`] — Field descriptors, checked kinds and values
//! - [`schema`] — Ordered per-type field registry
//! - [`record`] — Record instances and their storage structure
//! - [`store`] — Document store protocol and in-memory store
//! - [`mapper`] — Saving and loading records with conflict retry
//! - [`config`] — Persistence configuration
//! - [`identity`] — Short random document identities
//! - [`error`] — Error types and result type

pub mod composite;
pub mod config;
pub mod error;
pub mod field;
pub mod identity;
pub mod macros;
pub mod mapper;
pub mod record;
pub mod schema;
pub mod store;
pub mod subfield;

pub use composite::CompositeField;
pub use config::PersistenceConfig;
pub use error::{IsisError, Result};
pub use field::{
    Choice, FieldDescriptor, FieldInput, FieldKind, FieldSchema, FieldValue, FileValue, Validator,
};
pub use mapper::DocumentMapper;
pub use record::{Record, Structure};
pub use schema::{fields_of, is_field, schema_of, RecordSchema, RecordType, SchemaBuilder};
pub use store::{DocumentStore, MemoryStore, StoreError};
pub use subfield::{Subfield, SubfieldKeys};

#[doc(hidden)]
pub use lazy_static::lazy_static as __lazy_static;
