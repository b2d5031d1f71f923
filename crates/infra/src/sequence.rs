//! Named monotonic counters.
//!
//! Counters live in the `counters` collection as `{ _id: <name>, seq: <n> }`.
//! Allocation is one atomic upsert-and-increment in the store, so concurrent
//! callers never receive the same value and a never-used counter starts at 1.

use crate::error::{RepositoryError, RepositoryResult};
use crate::store::{Filter, ID_FIELD, SharedStore};

pub const COUNTERS_COLLECTION: &str = "counters";
const SEQ_FIELD: &str = "seq";

#[derive(Clone)]
pub struct SequenceGenerator {
    store: SharedStore,
}

impl SequenceGenerator {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Allocate the next value of `counter`.
    pub async fn next_value(&self, counter: &str) -> RepositoryResult<i64> {
        check_name(counter)?;
        let value = self
            .store
            .increment(COUNTERS_COLLECTION, counter, SEQ_FIELD, 1)
            .await?;
        tracing::debug!(counter, value, "sequence value allocated");
        Ok(value)
    }

    /// Last allocated value of `counter` (0 if it was never used).
    pub async fn current_value(&self, counter: &str) -> RepositoryResult<i64> {
        check_name(counter)?;
        let document = self
            .store
            .find_one(COUNTERS_COLLECTION, &Filter::eq(ID_FIELD, counter))
            .await?;
        Ok(document
            .and_then(|d| d.get(SEQ_FIELD).and_then(|v| v.as_i64()))
            .unwrap_or(0))
    }
}

fn check_name(counter: &str) -> RepositoryResult<()> {
    if counter.trim().is_empty() {
        return Err(RepositoryError::InvalidIdentifier(
            "counter name must not be empty".to_string(),
        ));
    }
    Ok(())
}
