//! Error types for ISIS data model operations.
//!
//! This module provides the [`IsisError`] type for all library operations
//! and the [`Result`] convenience type.

use thiserror::Error;

/// Error type for all ISIS data model operations.
///
/// Covers schema misuse, per-field validation failures, malformed subfield or
/// structure input, and the failure modes of the persistence layer.
#[derive(Error, Debug)]
pub enum IsisError {
    /// Schema misuse detected while registering a record type.
    ///
    /// This is a programmer error and is not meant to be recovered from at runtime.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A value was rejected by a field's type check or validator.
    #[error("Invalid value for field '{field}': {message}")]
    Validation {
        /// Name of the field being set
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// A required field is absent or null.
    #[error("Required field '{0}' is missing")]
    MissingRequiredField(String),

    /// A value was supplied for a name the record type does not declare.
    #[error("Record type '{record_type}' has no field named '{field}'")]
    UnknownField {
        /// Record type name
        record_type: String,
        /// Offending field name
        field: String,
    },

    /// Malformed composite string or storage structure.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Subfield lookup on a composite field found no matching key.
    #[error("Subfield '{0}' not found")]
    KeyNotFound(char),

    /// A stored structure belongs to a different record type.
    #[error("Type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch {
        /// Type the caller asked for
        expected: String,
        /// Discriminator found in the structure
        found: String,
    },

    /// The store has no document with the given identity.
    #[error("Document '{0}' not found")]
    NotFound(String),

    /// An update lost a race against a concurrent writer.
    #[error("Revision conflict on document '{0}'")]
    Conflict(String),

    /// Every generated identity collided with an existing document.
    #[error("Gave up saving after {attempts} conflicting identities")]
    PersistenceExhausted {
        /// Number of insert attempts made
        attempts: u32,
    },

    /// The store failed for a reason other than conflict or absence.
    #[error("Store error: {0}")]
    Store(String),

    /// IO error while reading a file source.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IsisError {
    /// Shorthand for a [`IsisError::Validation`] error.
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        IsisError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`IsisError`].
pub type Result<T> = std::result::Result<T, IsisError>;
