//! Entity trait: the persistence contract of a document kind.
//!
//! An entity names its collection, the fields that must stay unique across
//! that collection, and (optionally) the human-facing sequence field that the
//! repository assigns on insert.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::id::DocumentId;

/// Binding between an entity's integer identifier and its named counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SequenceField {
    /// Counter name in the `counters` collection (e.g. `"customerId"`).
    pub counter: &'static str,
    /// Document field receiving the allocated value (e.g. `"cus_id"`).
    pub field: &'static str,
}

/// Entity marker + minimal interface.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Insert-time shape: every caller-supplied field, without `_id`,
    /// timestamps or the sequence field.
    type Draft: Serialize + Send + Sync;

    /// Collection the entity is stored in.
    const COLLECTION: &'static str;

    /// Sequence-assigned identifier, if the entity has one.
    const SEQUENCE: Option<SequenceField> = None;

    /// Fields backed by a unique index.
    const UNIQUE_FIELDS: &'static [&'static str] = &[];

    /// Returns the store-assigned identifier.
    fn id(&self) -> &DocumentId;
}
