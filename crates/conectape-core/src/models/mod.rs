//! Data models for the directory.
//!
//! - `Contact`: general directory entry (`contactos`)
//! - `CongressionalContact`: restricted directory entry (`congresales`)
//! - `UserProfile`, `Role`: per-user profile driving navigation (`usuarios`)
//!
//! Stored documents are untyped, so text fields decode leniently (see `lenient`).

pub mod contact;
pub mod lenient;
pub mod profile;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::backend::Document;
use crate::utils::Searchable;

pub use contact::{CongressionalContact, Contact};
pub use profile::{Role, UserProfile};

/// Collection holding the general directory.
pub const CONTACTS_COLLECTION: &str = "contactos";

/// Collection holding the restricted congressional directory.
pub const CONGRESS_COLLECTION: &str = "congresales";

/// Collection holding user profiles, keyed by auth subject id.
pub const PROFILES_COLLECTION: &str = "usuarios";

/// A stored document whose fields could not be decoded into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed record {id}: {reason}")]
pub struct MalformedRecord {
    pub id: String,
    pub reason: String,
}

/// One row of a working set: a decoded record, or the id of a malformed one.
pub type Entry<T> = Result<T, MalformedRecord>;

/// A record type materialized from a directory collection.
pub trait DirectoryRecord: Searchable + DeserializeOwned + Clone + Send + 'static {
    /// Name of the collection the records are read from.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Phone as stored, before normalization.
    fn raw_phone(&self) -> Option<&str>;

    /// Decode a document, tagging the record with the document id.
    fn from_document(doc: &Document) -> Entry<Self> {
        let mut record: Self = serde_json::from_value(Value::Object(doc.fields.clone()))
            .map_err(|e| MalformedRecord {
                id: doc.id.clone(),
                reason: e.to_string(),
            })?;
        record.set_id(doc.id.clone());
        Ok(record)
    }
}
