//! Document store port.
//!
//! A [`DocumentStore`] persists schemaless JSON documents grouped into named
//! collections. Everything above this layer (sequence generator, repository,
//! relationship resolution) is written against the trait, so the same code
//! runs on the in-memory backend in tests and on MongoDB in production.
//!
//! ## Guarantees every backend provides
//!
//! - **Identity**: `insert_one`/`insert_many` assign a fresh `_id` (UUIDv7
//!   string) to documents that lack one, and `_id` is always unique.
//! - **Unique indexes**: after `ensure_unique_index(c, f)`, no two documents
//!   in `c` share a non-null value of `f`. Violations surface as
//!   [`StoreError::DuplicateKey`] from the write that would have caused them.
//! - **Atomic counters**: `increment` is a single upsert-and-add; concurrent
//!   callers always observe distinct values.
//! - **Atomic single-document ops**: `find_one_and_update` and
//!   `find_one_and_delete` read and write one document without a window in
//!   between.

pub mod filter;
pub mod in_memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod pipeline;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use filter::Filter;
pub use in_memory::InMemoryDocumentStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoDocumentStore;
pub use pipeline::{Lookup, Projection, Stage};

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Shared handle to a store backend.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Field holding a document's primary identifier.
pub const ID_FIELD: &str = "_id";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write would have broken a unique index.
    #[error("duplicate value for unique field `{field}` in `{collection}`")]
    DuplicateKey { collection: String, field: String },

    /// A document could not be encoded for, or decoded from, the backend.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Connectivity, lock poisoning or any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Paging options for [`DocumentStore::find`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn page(skip: u64, limit: u64) -> Self {
        Self {
            skip: Some(skip),
            limit: Some(limit),
        }
    }
}

/// Result of a multi-document update.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct UpdateCounts {
    /// Documents matching the filter.
    pub matched_count: u64,
    /// Documents whose content actually changed.
    pub modified_count: u64,
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create (idempotently) a unique index on `field`.
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> StoreResult<()>;

    /// Insert one document and return it as stored (with `_id`).
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Document>;

    /// Insert several documents.
    ///
    /// The in-memory backend is all-or-nothing. MongoDB performs an ordered
    /// insert, so documents before the first failure stay written.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Matching documents in natural (insertion) order.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// `$set` the given fields on every matching document.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> StoreResult<UpdateCounts>;

    /// `$set` the given fields on the first match and return it post-update.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> StoreResult<Option<Document>>;

    /// Remove the first match and return it.
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StoreResult<Option<Document>>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Atomically add `by` to the integer `field` of the document whose `_id`
    /// is `key`, creating it (from zero) when absent. Returns the new value.
    async fn increment(&self, collection: &str, key: &str, field: &str, by: i64)
    -> StoreResult<i64>;

    /// Run an aggregation pipeline over `collection`.
    async fn aggregate(&self, collection: &str, stages: &[Stage]) -> StoreResult<Vec<Document>>;
}

/// Resolve a dotted path (`"assignment.job_id"`) inside a document.
pub fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}
