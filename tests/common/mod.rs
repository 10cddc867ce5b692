//! Common record types and helpers shared across the test suite.

#![allow(dead_code)]

use isisdm::{
    record_type, DocumentMapper, FieldDescriptor, FieldValue, MemoryStore, PersistenceConfig,
};

/// Rejects titles starting with "Banana".
pub fn text_validator(_: &FieldDescriptor, value: &FieldValue) -> Result<(), String> {
    match value.as_text() {
        Some(text) if text.starts_with("Banana") => {
            Err("You can't start a text with 'Banana'".to_string())
        },
        _ => Ok(()),
    }
}

/// Requires every author in "LastName, FirstName" form.
pub fn colon_validator(_: &FieldDescriptor, value: &FieldValue) -> Result<(), String> {
    match value.as_texts() {
        Some(authors) if authors.iter().any(|author| !author.contains(',')) => {
            Err("Authors name must be in 'LastName, FirstName' format".to_string())
        },
        _ => Ok(()),
    }
}

record_type! {
    /// A monograph with plain-text authors.
    pub struct Book {
        FieldDescriptor::text("title").required().validator(text_validator),
        FieldDescriptor::multi_text("authors").validator(colon_validator),
        FieldDescriptor::text("pages"),
    }
}

record_type! {
    /// A journal article with structured authors.
    pub struct Article {
        FieldDescriptor::text("title").required(),
        FieldDescriptor::multi_composite_text("authors").subkeys("fl"),
        FieldDescriptor::composite_text("journal").subkeys("vn"),
        FieldDescriptor::boolean("peer_reviewed"),
        FieldDescriptor::text("language").choices([("en", "English"), ("pt", "Portuguese")]),
        FieldDescriptor::text("internal_note"),
    }
    hidden ["internal_note"]
}

record_type! {
    /// A scanned document with a single attached file.
    pub struct Scan {
        FieldDescriptor::text("title").required(),
        FieldDescriptor::file("page"),
        FieldDescriptor::file("thumbnail"),
    }
}

record_type! {
    /// A chapter pointing at the book that contains it.
    pub struct Chapter {
        FieldDescriptor::text("title").required(),
        FieldDescriptor::reference("book").required(),
    }
}

/// Install a test logger once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Configuration that never sleeps between retries.
pub fn fast_config() -> PersistenceConfig {
    PersistenceConfig::default().with_retry_delay_ms(0)
}

/// A mapper over a fresh in-memory store.
pub fn memory_mapper() -> DocumentMapper<MemoryStore> {
    init_logging();
    DocumentMapper::with_config(MemoryStore::new(), fast_config())
}
