//! Document store protocol and an in-memory implementation.
//!
//! The mapper talks to storage through [`DocumentStore`]: fetch a document by
//! identity, save a document (insert when it carries no revision, update
//! otherwise), and attach binary content to a stored document. Every write
//! yields a new revision token, and a write against a stale or unexpected
//! revision fails with [`StoreError::Conflict`].
//!
//! [`MemoryStore`] implements the protocol with CouchDB-like semantics and is
//! what the test suite runs against.

use crate::field::content_digest;
use crate::record::Structure;
use crate::schema::{ATTACHMENTS_KEY, ID_KEY, REVISION_KEY};
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors reported by a document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The write lost a race: the identity is taken or the revision is stale.
    #[error("Document update conflict")]
    Conflict,

    /// No document has the requested identity.
    #[error("Document not found")]
    NotFound,

    /// The store refused a malformed request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The store could not be reached or failed internally.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Versioned document storage.
pub trait DocumentStore {
    /// Fetch a document with its `_id`, `_rev` and `_attachments` metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no document has that identity.
    fn get(&self, id: &str) -> StoreResult<Structure>;

    /// Insert or update a document and return its new revision.
    ///
    /// The document must carry `_id`. Without `_rev` it is an insert; with
    /// `_rev` it replaces the stored version. Attachments survive only when
    /// listed under `_attachments`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when inserting a taken identity or
    /// updating from a stale revision.
    fn save(&self, document: &Structure) -> StoreResult<String>;

    /// Attach `content` under `filename` and return the new revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown documents and
    /// [`StoreError::Conflict`] for a stale revision.
    fn put_attachment(
        &self,
        id: &str,
        revision: &str,
        filename: &str,
        content: &Bytes,
    ) -> StoreResult<String>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get(&self, id: &str) -> StoreResult<Structure> {
        (**self).get(id)
    }

    fn save(&self, document: &Structure) -> StoreResult<String> {
        (**self).save(document)
    }

    fn put_attachment(
        &self,
        id: &str,
        revision: &str,
        filename: &str,
        content: &Bytes,
    ) -> StoreResult<String> {
        (**self).put_attachment(id, revision, filename, content)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn get(&self, id: &str) -> StoreResult<Structure> {
        (**self).get(id)
    }

    fn save(&self, document: &Structure) -> StoreResult<String> {
        (**self).save(document)
    }

    fn put_attachment(
        &self,
        id: &str,
        revision: &str,
        filename: &str,
        content: &Bytes,
    ) -> StoreResult<String> {
        (**self).put_attachment(id, revision, filename, content)
    }
}

#[derive(Debug, Clone)]
struct StoredAttachment {
    digest: String,
    content: Bytes,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    body: Structure,
    sequence: u64,
    revision: String,
    attachments: HashMap<String, StoredAttachment>,
}

impl StoredDocument {
    fn bump(&mut self) -> String {
        self.sequence += 1;
        let mut fingerprint = Value::Object(self.body.clone()).to_string();
        let mut names: Vec<&String> = self.attachments.keys().collect();
        names.sort();
        for name in names {
            fingerprint.push_str(name);
            fingerprint.push_str(&self.attachments[name].digest);
        }
        self.revision = format!(
            "{}-{}",
            self.sequence,
            &content_digest(fingerprint.as_bytes())[..16]
        );
        self.revision.clone()
    }

    fn to_structure(&self, id: &str) -> Structure {
        let mut structure = self.body.clone();
        structure.insert(ID_KEY.to_string(), Value::String(id.to_string()));
        structure.insert(REVISION_KEY.to_string(), Value::String(self.revision.clone()));
        if !self.attachments.is_empty() {
            let stubs = self
                .attachments
                .iter()
                .map(|(name, attachment)| {
                    (
                        name.clone(),
                        json!({
                            "digest": attachment.digest,
                            "length": attachment.content.len(),
                            "stub": true,
                        }),
                    )
                })
                .collect();
            structure.insert(ATTACHMENTS_KEY.to_string(), Value::Object(stubs));
        }
        structure
    }
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store holds no documents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Content of an attachment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the document or attachment does not exist.
    pub fn attachment(&self, id: &str, filename: &str) -> StoreResult<Bytes> {
        self.read()?
            .get(id)
            .and_then(|doc| doc.attachments.get(filename))
            .map(|attachment| attachment.content.clone())
            .ok_or(StoreError::NotFound)
    }

    fn read(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<String, StoredDocument>>> {
        self.documents
            .read()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<String, StoredDocument>>> {
        self.documents
            .write()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: &str) -> StoreResult<Structure> {
        self.read()?
            .get(id)
            .map(|doc| doc.to_structure(id))
            .ok_or(StoreError::NotFound)
    }

    fn save(&self, document: &Structure) -> StoreResult<String> {
        let id = match document.get(ID_KEY) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => return Err(StoreError::Rejected("document has no _id".to_string())),
        };
        let revision = match document.get(REVISION_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(rev)) => Some(rev.as_str()),
            Some(other) => return Err(StoreError::Rejected(format!("bad _rev {other}"))),
        };

        let mut documents = self.write()?;
        let existing = documents.get(&id);
        match (existing, revision) {
            (None, None) => {},
            (Some(current), Some(rev)) if current.revision == rev => {},
            _ => return Err(StoreError::Conflict),
        }

        let mut attachments = HashMap::new();
        if let Some(stubs) = document.get(ATTACHMENTS_KEY) {
            let stubs = stubs
                .as_object()
                .ok_or_else(|| StoreError::Rejected("_attachments must be an object".to_string()))?;
            for name in stubs.keys() {
                let kept = existing
                    .and_then(|current| current.attachments.get(name))
                    .ok_or_else(|| {
                        StoreError::Rejected(format!("attachment stub '{name}' has no data"))
                    })?;
                attachments.insert(name.clone(), kept.clone());
            }
        }

        let body: Structure = document
            .iter()
            .filter(|(key, _)| {
                key.as_str() != ID_KEY && key.as_str() != REVISION_KEY && key.as_str() != ATTACHMENTS_KEY
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut stored = StoredDocument {
            body,
            sequence: existing.map_or(0, |current| current.sequence),
            revision: String::new(),
            attachments,
        };
        let revision = stored.bump();
        documents.insert(id, stored);
        Ok(revision)
    }

    fn put_attachment(
        &self,
        id: &str,
        revision: &str,
        filename: &str,
        content: &Bytes,
    ) -> StoreResult<String> {
        let mut documents = self.write()?;
        let stored = documents.get_mut(id).ok_or(StoreError::NotFound)?;
        if stored.revision != revision {
            return Err(StoreError::Conflict);
        }
        stored.attachments.insert(
            filename.to_string(),
            StoredAttachment {
                digest: content_digest(content),
                content: content.clone(),
            },
        );
        Ok(stored.bump())
    }
}
