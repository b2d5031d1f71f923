//! Entity lifecycle hooks.
//!
//! Hooks run in registration order on every document a repository is about
//! to insert, after the caller's fields are in place and before the store
//! sees it. A failing hook aborts the insert (nothing is written).
//!
//! The sequence hook runs last, so a hook failure on a single document never
//! burns a counter value. A value is still consumed when the insert itself
//! fails afterwards (e.g. on a unique-index conflict). A batch insert
//! prepares every document before writing any of them, so a hook failure on
//! a later document loses the values already allocated to earlier ones.
//! Sequences may therefore have gaps but never repeat.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crewdesk_core::SequenceField;

use crate::error::{RepositoryError, RepositoryResult};
use crate::sequence::SequenceGenerator;
use crate::store::Document;

pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[async_trait::async_trait]
pub trait InsertHook: Send + Sync {
    /// Hook name used in errors and logs.
    fn name(&self) -> &'static str;

    async fn before_insert(&self, collection: &str, document: &mut Document)
    -> RepositoryResult<()>;
}

#[async_trait::async_trait]
impl<H> InsertHook for Arc<H>
where
    H: InsertHook + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn before_insert(
        &self,
        collection: &str,
        document: &mut Document,
    ) -> RepositoryResult<()> {
        (**self).before_insert(collection, document).await
    }
}

pub(crate) fn timestamp_value(at: DateTime<Utc>) -> RepositoryResult<Value> {
    Ok(serde_json::to_value(at)?)
}

/// Stamps `createdAt` and `updatedAt` with the insert time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampHook;

#[async_trait::async_trait]
impl InsertHook for TimestampHook {
    fn name(&self) -> &'static str {
        "timestamps"
    }

    async fn before_insert(
        &self,
        _collection: &str,
        document: &mut Document,
    ) -> RepositoryResult<()> {
        let now = timestamp_value(Utc::now())?;
        document.insert(CREATED_AT_FIELD.to_string(), now.clone());
        document.insert(UPDATED_AT_FIELD.to_string(), now);
        Ok(())
    }
}

/// Assigns the next value of an entity's counter to its sequence field.
#[derive(Clone)]
pub struct SequenceHook {
    sequences: SequenceGenerator,
    sequence: SequenceField,
}

impl SequenceHook {
    pub fn new(sequences: SequenceGenerator, sequence: SequenceField) -> Self {
        Self {
            sequences,
            sequence,
        }
    }
}

#[async_trait::async_trait]
impl InsertHook for SequenceHook {
    fn name(&self) -> &'static str {
        "sequence"
    }

    async fn before_insert(&self, collection: &str, document: &mut Document) -> RepositoryResult<()> {
        let value = self
            .sequences
            .next_value(self.sequence.counter)
            .await
            .map_err(|e| RepositoryError::Hook {
                hook: self.name(),
                reason: e.to_string(),
            })?;
        tracing::debug!(collection, field = self.sequence.field, value, "sequence assigned");
        document.insert(self.sequence.field.to_string(), Value::from(value));
        Ok(())
    }
}
