use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crewdesk_core::DocumentId;

use super::pipeline;
use super::{
    DocumentStore, Document, Filter, FindOptions, ID_FIELD, Stage, StoreError, StoreResult,
    UpdateCounts,
};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Vec<Document>>,
    unique: HashMap<String, BTreeSet<String>>,
}

impl State {
    fn documents(&self, collection: &str) -> &[Document] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn unique_fields(&self, collection: &str) -> impl Iterator<Item = &str> {
        std::iter::once(ID_FIELD).chain(
            self.unique
                .get(collection)
                .into_iter()
                .flat_map(|fields| fields.iter().map(String::as_str)),
        )
    }

    /// Check `candidate` against every document of `existing` except the one
    /// at `skip`.
    fn check_unique(
        &self,
        collection: &str,
        existing: &[Document],
        candidate: &Document,
        skip: Option<usize>,
    ) -> StoreResult<()> {
        for field in self.unique_fields(collection) {
            let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = existing
                .iter()
                .enumerate()
                .any(|(idx, other)| Some(idx) != skip && other.get(field) == Some(value));
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// In-memory document store.
///
/// Intended for tests/dev. Every operation takes the single lock once, which
/// makes each call atomic with respect to all others (counters, unique
/// indexes and find-and-modify included). Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<State>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn with_identity(mut document: Document) -> Document {
    if !document.contains_key(ID_FIELD) {
        document.insert(
            ID_FIELD.to_string(),
            Value::String(DocumentId::new().to_string()),
        );
    }
    document
}

/// Apply `$set`; returns whether anything changed.
fn apply_set(document: &mut Document, set: &Document) -> bool {
    let mut changed = false;
    for (field, value) in set {
        if document.get(field) != Some(value) {
            document.insert(field.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut state = self.write()?;
        let existing = state.documents(collection);
        let mut seen = Vec::with_capacity(existing.len());
        for value in existing.iter().filter_map(|d| d.get(field)).filter(|v| !v.is_null()) {
            if seen.contains(&value) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
            seen.push(value);
        }
        state
            .unique
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string());
        Ok(())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let document = with_identity(document);
        let mut state = self.write()?;
        state.check_unique(collection, state.documents(collection), &document, None)?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<Document>> {
        let documents: Vec<Document> = documents.into_iter().map(with_identity).collect();
        let mut state = self.write()?;

        let mut staged = state.documents(collection).to_vec();
        for document in &documents {
            state.check_unique(collection, &staged, document, None)?;
            staged.push(document.clone());
        }
        state.collections.insert(collection.to_string(), staged);
        Ok(documents)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let state = self.read()?;
        Ok(state
            .documents(collection)
            .iter()
            .find(|d| filter.matches(d))
            .cloned())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let state = self.read()?;
        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(state
            .documents(collection)
            .iter()
            .filter(|d| filter.matches(d))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let state = self.read()?;
        Ok(state
            .documents(collection)
            .iter()
            .filter(|d| filter.matches(d))
            .count() as u64)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> StoreResult<UpdateCounts> {
        let mut state = self.write()?;
        let mut staged = state.documents(collection).to_vec();
        let mut counts = UpdateCounts::default();
        let mut touched = Vec::new();

        for (idx, document) in staged.iter_mut().enumerate() {
            if filter.matches(document) {
                counts.matched_count += 1;
                if apply_set(document, &set) {
                    counts.modified_count += 1;
                    touched.push(idx);
                }
            }
        }
        for idx in touched {
            state.check_unique(collection, &staged, &staged[idx], Some(idx))?;
        }
        if counts.modified_count > 0 {
            state.collections.insert(collection.to_string(), staged);
        }
        Ok(counts)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> StoreResult<Option<Document>> {
        let mut state = self.write()?;
        let Some(idx) = state
            .documents(collection)
            .iter()
            .position(|d| filter.matches(d))
        else {
            return Ok(None);
        };

        let mut updated = state.documents(collection)[idx].clone();
        apply_set(&mut updated, &set);
        state.check_unique(collection, state.documents(collection), &updated, Some(idx))?;

        if let Some(documents) = state.collections.get_mut(collection) {
            documents[idx] = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let mut state = self.write()?;
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(documents
            .iter()
            .position(|d| filter.matches(d))
            .map(|idx| documents.remove(idx)))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut state = self.write()?;
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|d| !filter.matches(d));
        Ok((before - documents.len()) as u64)
    }

    async fn increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        by: i64,
    ) -> StoreResult<i64> {
        let mut state = self.write()?;
        let documents = state.collections.entry(collection.to_string()).or_default();
        let key_value = Value::String(key.to_string());

        let idx = match documents.iter().position(|d| d.get(ID_FIELD) == Some(&key_value)) {
            Some(idx) => idx,
            None => {
                let mut counter = Document::new();
                counter.insert(ID_FIELD.to_string(), key_value);
                documents.push(counter);
                documents.len() - 1
            }
        };

        let counter = &mut documents[idx];
        let current = match counter.get(field) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                StoreError::Malformed(format!("counter `{key}` field `{field}` is not an integer"))
            })?,
        };
        let next = current + by;
        counter.insert(field.to_string(), Value::from(next));
        Ok(next)
    }

    async fn aggregate(&self, collection: &str, stages: &[Stage]) -> StoreResult<Vec<Document>> {
        let state = self.read()?;
        let input = state.documents(collection).to_vec();
        Ok(pipeline::run(input, stages, |name| state.documents(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_identity() {
        let store = InMemoryDocumentStore::new();
        let stored = store.insert_one("job", doc(json!({ "job_sku": "A" }))).await.unwrap();
        let id = stored[ID_FIELD].as_str().unwrap();
        assert!(id.parse::<DocumentId>().is_ok());
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates_on_insert_and_update() {
        let store = InMemoryDocumentStore::new();
        store.ensure_unique_index("job", "job_sku").await.unwrap();
        store.insert_one("job", doc(json!({ "job_sku": "A" }))).await.unwrap();
        store.insert_one("job", doc(json!({ "job_sku": "B" }))).await.unwrap();

        let err = store
            .insert_one("job", doc(json!({ "job_sku": "A" })))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateKey {
                collection: "job".into(),
                field: "job_sku".into()
            }
        );

        let err = store
            .update_many("job", &Filter::eq("job_sku", "B"), doc(json!({ "job_sku": "A" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store.count("job", &Filter::eq("job_sku", "B")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_many_is_all_or_nothing() {
        let store = InMemoryDocumentStore::new();
        store.ensure_unique_index("employee_job", "emp_id").await.unwrap();
        store
            .insert_one("employee_job", doc(json!({ "emp_id": 2 })))
            .await
            .unwrap();

        let batch = vec![doc(json!({ "emp_id": 1 })), doc(json!({ "emp_id": 2 }))];
        assert!(store.insert_many("employee_job", batch).await.is_err());
        assert_eq!(store.count("employee_job", &Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn find_one_and_delete_removes_exactly_one() {
        let store = InMemoryDocumentStore::new();
        for n in 0..3 {
            store.insert_one("c", doc(json!({ "n": n, "k": "x" }))).await.unwrap();
        }
        let removed = store
            .find_one_and_delete("c", &Filter::eq("k", "x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed["n"], json!(0));
        assert_eq!(store.count("c", &Filter::All).await.unwrap(), 2);
        assert!(
            store
                .find_one_and_delete("c", &Filter::eq("k", "nope"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn update_many_reports_matched_and_modified() {
        let store = InMemoryDocumentStore::new();
        store.insert_one("c", doc(json!({ "k": 1, "v": "a" }))).await.unwrap();
        store.insert_one("c", doc(json!({ "k": 1, "v": "b" }))).await.unwrap();

        let counts = store
            .update_many("c", &Filter::eq("k", 1), doc(json!({ "v": "b" })))
            .await
            .unwrap();
        assert_eq!(
            counts,
            UpdateCounts {
                matched_count: 2,
                modified_count: 1
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_yield_distinct_values() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment("counters", "jobId", "seq", 1).await.unwrap()
            }));
        }
        let mut values = Vec::new();
        for h in handles {
            values.push(h.await.unwrap());
        }
        values.sort_unstable();
        assert_eq!(values, (1..=50).collect::<Vec<i64>>());
    }
}
