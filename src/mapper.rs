//! Persisting records in a [`DocumentStore`].
//!
//! [`DocumentMapper::save`] serializes a record, assigns it an identity on
//! first save, commits it, uploads or carries forward its file attachments,
//! and writes the resulting identity and revision back into the record.
//!
//! Inserts under a generated identity are retried with a fresh identity when
//! the store reports a conflict, up to
//! [`PersistenceConfig::max_attempts`](crate::PersistenceConfig::max_attempts).
//! Every other store failure, including a conflict on update, is returned to
//! the caller.

use crate::config::PersistenceConfig;
use crate::error::{IsisError, Result};
use crate::field::{FieldValue, FileValue};
use crate::identity::generate_identity;
use crate::record::{Record, Structure};
use crate::schema::{RecordSchema, RecordType, ATTACHMENTS_KEY, ID_KEY};
use crate::store::{DocumentStore, StoreError};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

const IDENTITY_REDRAWS: usize = 8;

/// Saves and loads records through a document store.
///
/// # Examples
///
/// ```
/// use isisdm::{
///     record_type, DocumentMapper, FieldDescriptor, MemoryStore, PersistenceConfig, Record,
/// };
///
/// record_type! {
///     struct Book {
///         FieldDescriptor::text("title").required(),
///         FieldDescriptor::multi_text("authors"),
///     }
/// }
///
/// let mapper = DocumentMapper::with_config(
///     MemoryStore::new(),
///     PersistenceConfig::default().with_retry_delay_ms(0),
/// );
///
/// let mut book = Record::of::<Book>([("title", "Godel, Escher, Bach")]).unwrap();
/// let id = mapper.save(&mut book).unwrap();
///
/// let loaded = mapper.get_as::<Book>(&id).unwrap();
/// assert_eq!(loaded.text("title"), Some("Godel, Escher, Bach"));
/// assert_eq!(loaded, book);
/// ```
#[derive(Debug)]
pub struct DocumentMapper<S> {
    store: S,
    config: PersistenceConfig,
}

impl<S: DocumentStore> DocumentMapper<S> {
    /// Create a mapper with the default configuration.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_config(store, PersistenceConfig::default())
    }

    /// Create a mapper with an explicit configuration.
    #[must_use]
    pub fn with_config(store: S, config: PersistenceConfig) -> Self {
        DocumentMapper { store, config }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The persistence configuration.
    #[must_use]
    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Save a record and return its identity.
    ///
    /// A record without identity is inserted under a generated one. A record
    /// with identity but no revision is inserted under that identity. A
    /// record with both updates the stored document: unchanged files keep
    /// their stored attachment, changed files are uploaded again.
    ///
    /// On success the record carries the identity and latest revision.
    ///
    /// # Errors
    ///
    /// - [`IsisError::Validation`] if a file that must be uploaded has no content
    /// - [`IsisError::PersistenceExhausted`] if every generated identity conflicted
    /// - [`IsisError::Conflict`] if an update or fixed-identity insert lost a race
    /// - [`IsisError::NotFound`] if the document to update no longer exists
    /// - [`IsisError::Store`] for any other store failure
    pub fn save(&self, record: &mut Record) -> Result<String> {
        let mut document = record.to_structure();

        let (identity, revision, uploads) = match (record.identity(), record.revision()) {
            (Some(identity), Some(_)) => {
                let previous = self
                    .store
                    .get(identity)
                    .map_err(|e| translate(e, identity))?;
                let uploads = plan_update(record, &previous, &mut document)?;
                let revision = self
                    .store
                    .save(&document)
                    .map_err(|e| translate(e, identity))?;
                (identity.to_string(), revision, uploads)
            },
            (fixed, _) => {
                let uploads = plan_insert(record)?;
                let (identity, revision) = self.insert(&mut document, fixed)?;
                (identity, revision, uploads)
            },
        };

        // committed: from here on the record points at the stored document
        record.mark_saved(identity.clone(), revision.clone());

        let mut revision = revision;
        for file in uploads {
            let Some(content) = file.content() else {
                continue;
            };
            debug!(
                "uploading attachment {} ({} bytes) to {identity}",
                file.filename(),
                content.len()
            );
            revision = self
                .store
                .put_attachment(&identity, &revision, file.filename(), content)
                .map_err(|e| translate(e, &identity))?;
            record.mark_saved(identity.clone(), revision.clone());
        }

        info!(
            "saved {} {identity} at revision {revision}",
            record.record_type()
        );
        Ok(identity)
    }

    fn insert(&self, document: &mut Structure, fixed: Option<&str>) -> Result<(String, String)> {
        if let Some(identity) = fixed {
            document.insert(ID_KEY.to_string(), Value::String(identity.to_string()));
            let revision = self
                .store
                .save(document)
                .map_err(|e| translate(e, identity))?;
            return Ok((identity.to_string(), revision));
        }

        let mut tried = HashSet::new();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let identity = self.fresh_identity(&tried);
            debug!("attempt {attempts}: inserting under identity {identity}");
            document.insert(ID_KEY.to_string(), Value::String(identity.clone()));

            match self.store.save(document) {
                Ok(revision) => return Ok((identity, revision)),
                Err(StoreError::Conflict) => {
                    warn!("identity {identity} already taken (attempt {attempts})");
                    if attempts >= self.config.max_attempts {
                        return Err(IsisError::PersistenceExhausted { attempts });
                    }
                    tried.insert(identity);
                    std::thread::sleep(self.config.retry_delay());
                },
                Err(e) => return Err(translate(e, &identity)),
            }
        }
    }

    fn fresh_identity(&self, tried: &HashSet<String>) -> String {
        let mut identity = generate_identity(self.config.identity_length);
        for _ in 0..IDENTITY_REDRAWS {
            if !tried.contains(&identity) {
                break;
            }
            identity = generate_identity(self.config.identity_length);
        }
        identity
    }

    /// Load the document `id` as a record of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::NotFound`] if the store has no such document,
    /// [`IsisError::TypeMismatch`] if it belongs to another type, and any
    /// error of [`Record::from_structure`].
    pub fn get(&self, schema: Arc<RecordSchema>, id: &str) -> Result<Record> {
        let document = self.store.get(id).map_err(|e| translate(e, id))?;
        Record::from_structure(schema, &document)
    }

    /// [`DocumentMapper::get`] for a statically registered type.
    ///
    /// # Errors
    ///
    /// See [`DocumentMapper::get`].
    pub fn get_as<T: RecordType>(&self, id: &str) -> Result<Record> {
        self.get(T::schema(), id)
    }
}

/// Every file of a first save must be uploaded.
fn plan_insert(record: &Record) -> Result<Vec<FileValue>> {
    record
        .files()
        .map(|(name, file)| require_content(name, file))
        .collect()
}

/// Decide, per file field, whether to upload or carry the stored attachment
/// forward, and write the carried-forward stubs into `document`.
///
/// A file is unchanged when the store still holds an attachment of that name
/// with the same digest. Attachments not owned by any file field of the
/// previous version are carried forward as they are.
fn plan_update(
    record: &Record,
    previous: &Structure,
    document: &mut Structure,
) -> Result<Vec<FileValue>> {
    let previous_stubs = previous
        .get(ATTACHMENTS_KEY)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let owned: HashSet<String> = record
        .schema()
        .fields()
        .filter_map(|descriptor| {
            let stored = previous.get(descriptor.name())?;
            match descriptor.accept(stored.clone().into()) {
                Ok(FieldValue::File(file)) => Some(file.filename().to_string()),
                _ => None,
            }
        })
        .collect();

    let mut stubs: Map<String, Value> = previous_stubs
        .iter()
        .filter(|(name, _)| !owned.contains(name.as_str()))
        .map(|(name, stub)| (name.clone(), stub.clone()))
        .collect();

    let mut uploads = Vec::new();
    for (name, file) in record.files() {
        let stored = previous_stubs
            .get(file.filename())
            .filter(|stub| stub.get("digest").and_then(Value::as_str) == Some(file.digest()));
        if let Some(stub) = stored {
            debug!("attachment {} unchanged, carrying forward", file.filename());
            stubs.insert(file.filename().to_string(), stub.clone());
        } else {
            uploads.push(require_content(name, file)?);
        }
    }

    if !stubs.is_empty() {
        document.insert(ATTACHMENTS_KEY.to_string(), Value::Object(stubs));
    }
    Ok(uploads)
}

fn require_content(name: &str, file: &FileValue) -> Result<FileValue> {
    if file.content().is_none() {
        return Err(IsisError::validation(
            name,
            format!("file '{}' has no content to upload", file.filename()),
        ));
    }
    Ok(file.clone())
}

fn translate(error: StoreError, id: &str) -> IsisError {
    match error {
        StoreError::Conflict => IsisError::Conflict(id.to_string()),
        StoreError::NotFound => IsisError::NotFound(id.to_string()),
        StoreError::Rejected(message) | StoreError::Unavailable(message) => {
            IsisError::Store(message)
        },
    }
}
