//! Document store abstraction.
//!
//! The crawler needs only two operations from persistence: "is there a
//! document whose field `F` equals `V`?" and "insert this document". Both
//! backends treat insert as conditional on the document id, so a duplicate
//! that slips past the existence check is still not written twice.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::Posting;
use async_trait::async_trait;

#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Whether `collection` holds a document whose `field` equals `value`
    async fn exists(&self, collection: &str, field: &str, value: &str) -> Result<bool, StoreError>;

    /// Insert `posting`, stamping it with a creation time.
    ///
    /// Returns `false` without writing when a document with the same id is
    /// already present.
    async fn insert(&self, collection: &str, posting: &Posting) -> Result<bool, StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Compare a top-level string field of a serialized document
pub(crate) fn field_matches(document: &serde_json::Value, field: &str, value: &str) -> bool {
    document.get(field).and_then(|v| v.as_str()) == Some(value)
}
