//! Generic entity repository.
//!
//! `Repository<E>` implements the CRUD surface once for every [`Entity`]:
//! documents go in as the entity's `Draft`, pass the insert hooks (timestamps,
//! then the sequence field), and come back out typed as `E`.
//!
//! ## Write rules
//!
//! - Callers never choose `_id`, `createdAt` or the sequence field: those keys
//!   are stripped from drafts and from update payloads.
//! - Every update stamps `updatedAt`.
//! - Unique-index violations surface as [`RepositoryError::Conflict`] from
//!   the write itself; there is no read-then-write pre-check.
//! - Deletes are a single atomic find-and-delete.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use crewdesk_core::{DocumentId, Entity, Page, PageRequest, Pagination};

use crate::error::{RepositoryError, RepositoryResult};
use crate::hooks::{CREATED_AT_FIELD, InsertHook, SequenceHook, TimestampHook, UPDATED_AT_FIELD, timestamp_value};
use crate::relations::JoinSpec;
use crate::sequence::SequenceGenerator;
use crate::store::{Document, Filter, FindOptions, ID_FIELD, SharedStore, Stage};

/// Result of [`Repository::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome<E> {
    /// Documents matching the filter.
    pub matched_count: u64,
    /// Documents actually modified.
    pub affected_count: u64,
    /// Documents matching the filter after the update.
    pub updated_rows: Vec<E>,
}

/// Result of [`Repository::delete`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome<E> {
    pub deleted: Option<E>,
    pub deleted_count: u64,
}

pub struct Repository<E> {
    store: SharedStore,
    hooks: Vec<Arc<dyn InsertHook>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hooks: self.hooks.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    /// Bind a repository to `store`: create the entity's unique indexes and
    /// install the default hooks (timestamps, then the sequence if any).
    pub async fn bind(store: SharedStore) -> RepositoryResult<Self> {
        for field in E::UNIQUE_FIELDS {
            store.ensure_unique_index(E::COLLECTION, field).await?;
        }

        let mut hooks: Vec<Arc<dyn InsertHook>> = vec![Arc::new(TimestampHook)];
        if let Some(sequence) = E::SEQUENCE {
            hooks.push(Arc::new(SequenceHook::new(
                SequenceGenerator::new(store.clone()),
                sequence,
            )));
        }
        tracing::debug!(collection = E::COLLECTION, "repository bound");

        Ok(Self {
            store,
            hooks,
            _entity: PhantomData,
        })
    }

    /// Install an additional hook ahead of the sequence hook.
    pub fn with_hook(mut self, hook: impl InsertHook + 'static) -> Self {
        let at = match E::SEQUENCE {
            Some(_) => self.hooks.len() - 1,
            None => self.hooks.len(),
        };
        self.hooks.insert(at, Arc::new(hook));
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    async fn prepare(&self, draft: &E::Draft) -> RepositoryResult<Document> {
        let mut document = to_document(draft)?;
        document.remove(ID_FIELD);
        document.remove(CREATED_AT_FIELD);
        document.remove(UPDATED_AT_FIELD);
        if let Some(sequence) = E::SEQUENCE {
            document.remove(sequence.field);
        }

        for hook in &self.hooks {
            if let Err(err) = hook.before_insert(E::COLLECTION, &mut document).await {
                tracing::warn!(
                    collection = E::COLLECTION,
                    hook = hook.name(),
                    error = %err,
                    "insert hook failed"
                );
                return Err(err);
            }
        }
        Ok(document)
    }

    /// Persist a new entity.
    #[instrument(skip(self, draft), fields(collection = E::COLLECTION))]
    pub async fn create(&self, draft: &E::Draft) -> RepositoryResult<E> {
        let document = self.prepare(draft).await?;
        let stored = self.store.insert_one(E::COLLECTION, document).await?;
        from_document(stored)
    }

    /// Persist several entities; each passes the hooks individually.
    pub async fn create_many(&self, drafts: &[E::Draft]) -> RepositoryResult<Vec<E>> {
        let mut documents = Vec::with_capacity(drafts.len());
        for draft in drafts {
            documents.push(self.prepare(draft).await?);
        }
        self.store
            .insert_many(E::COLLECTION, documents)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn get_one(&self, filter: &Filter) -> RepositoryResult<Option<E>> {
        self.store
            .find_one(E::COLLECTION, filter)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Look up by `_id`. A malformed id is an error, not a miss.
    pub async fn get_by_id(&self, id: &str) -> RepositoryResult<Option<E>> {
        let id: DocumentId = id
            .parse()
            .map_err(|_| RepositoryError::InvalidIdentifier(format!("`{id}` is not a valid id")))?;
        self.get_one(&Filter::eq(ID_FIELD, id.to_string())).await
    }

    /// Every match, unpaginated.
    pub async fn get_many(&self, filter: &Filter) -> RepositoryResult<Vec<E>> {
        self.store
            .find(E::COLLECTION, filter, FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn count(&self, filter: &Filter) -> RepositoryResult<u64> {
        Ok(self.store.count(E::COLLECTION, filter).await?)
    }

    /// One page of matching entities plus pagination metadata.
    pub async fn get_all(&self, filter: &Filter, page: PageRequest) -> RepositoryResult<Page<E>> {
        let total = self.store.count(E::COLLECTION, filter).await?;
        let documents = self
            .store
            .find(
                E::COLLECTION,
                filter,
                FindOptions::page(page.offset(), page.limit()),
            )
            .await?;
        Ok(Page {
            data: documents
                .into_iter()
                .map(from_document)
                .collect::<RepositoryResult<_>>()?,
            pagination: Pagination::new(page, total),
        })
    }

    /// Run `stages` and return every resulting row.
    pub async fn aggregate<T: DeserializeOwned>(&self, stages: &[Stage]) -> RepositoryResult<Vec<T>> {
        self.store
            .aggregate(E::COLLECTION, stages)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Paginated aggregation.
    ///
    /// The total counts documents passing the pipeline's `Match` stages only;
    /// joins and projections do not change it.
    pub async fn get_all_with_aggregation<T: DeserializeOwned>(
        &self,
        stages: Vec<Stage>,
        page: PageRequest,
    ) -> RepositoryResult<Page<T>> {
        let count_filter = stages
            .iter()
            .filter_map(|stage| match stage {
                Stage::Match(filter) => Some(filter.clone()),
                _ => None,
            })
            .fold(Filter::All, Filter::and);
        let total = self.store.count(E::COLLECTION, &count_filter).await?;

        let mut stages = stages;
        stages.push(Stage::Skip(page.offset()));
        stages.push(Stage::Limit(page.limit()));
        Ok(Page {
            data: self.aggregate(&stages).await?,
            pagination: Pagination::new(page, total),
        })
    }

    /// Paginated entities matching `filter`, each decorated by `joins`.
    pub async fn get_all_with_joins<T: DeserializeOwned>(
        &self,
        filter: &Filter,
        joins: &[JoinSpec],
        page: PageRequest,
    ) -> RepositoryResult<Page<T>> {
        let mut stages = vec![Stage::Match(filter.clone())];
        stages.extend(joins.iter().flat_map(JoinSpec::stages));
        self.get_all_with_aggregation(stages, page).await
    }

    /// Set `fields` on every match, then re-read the matches.
    #[instrument(skip(self, fields), fields(collection = E::COLLECTION))]
    pub async fn update<P: Serialize + ?Sized>(
        &self,
        filter: &Filter,
        fields: &P,
    ) -> RepositoryResult<UpdateOutcome<E>> {
        let set = self.update_set(fields)?;
        let counts = self.store.update_many(E::COLLECTION, filter, set).await?;
        let updated_rows = self
            .store
            .find(E::COLLECTION, filter, FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect::<RepositoryResult<_>>()?;
        Ok(UpdateOutcome {
            matched_count: counts.matched_count,
            affected_count: counts.modified_count,
            updated_rows,
        })
    }

    /// Set `fields` on the first match and return it post-update.
    pub async fn update_one_returning<P: Serialize + ?Sized>(
        &self,
        filter: &Filter,
        fields: &P,
    ) -> RepositoryResult<Option<E>> {
        let set = self.update_set(fields)?;
        self.store
            .find_one_and_update(E::COLLECTION, filter, set)
            .await?
            .map(from_document)
            .transpose()
    }

    fn update_set<P: Serialize + ?Sized>(&self, fields: &P) -> RepositoryResult<Document> {
        let mut set = to_document(fields)?;
        set.remove(ID_FIELD);
        set.remove(CREATED_AT_FIELD);
        if let Some(sequence) = E::SEQUENCE {
            set.remove(sequence.field);
        }
        set.insert(UPDATED_AT_FIELD.to_string(), timestamp_value(Utc::now())?);
        Ok(set)
    }

    /// Atomically remove the first match.
    #[instrument(skip(self), fields(collection = E::COLLECTION))]
    pub async fn delete(&self, filter: &Filter) -> RepositoryResult<DeleteOutcome<E>> {
        let deleted = self
            .store
            .find_one_and_delete(E::COLLECTION, filter)
            .await?
            .map(from_document::<E>)
            .transpose()?;
        let deleted_count = u64::from(deleted.is_some());
        Ok(DeleteOutcome {
            deleted,
            deleted_count,
        })
    }

    pub async fn delete_all(&self, filter: &Filter) -> RepositoryResult<u64> {
        Ok(self.store.delete_many(E::COLLECTION, filter).await?)
    }
}

fn to_document<T: Serialize + ?Sized>(value: &T) -> RepositoryResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::Serialization(format!(
            "expected an object, got {other}"
        ))),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> RepositoryResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDocumentStore, Projection};
    use chrono::DateTime;
    use crewdesk_core::SequenceField;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Crate {
        #[serde(rename = "_id")]
        id: DocumentId,
        crate_no: i64,
        label: String,
        owner: i64,
        #[serde(rename = "createdAt")]
        created_at: DateTime<Utc>,
        #[serde(rename = "updatedAt")]
        updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Clone, Serialize)]
    struct NewCrate {
        label: String,
        owner: i64,
    }

    impl Entity for Crate {
        type Draft = NewCrate;
        const COLLECTION: &'static str = "crate";
        const SEQUENCE: Option<SequenceField> = Some(SequenceField {
            counter: "crateNo",
            field: "crate_no",
        });
        const UNIQUE_FIELDS: &'static [&'static str] = &["crate_no", "label"];

        fn id(&self) -> &DocumentId {
            &self.id
        }
    }

    fn draft(label: &str, owner: i64) -> NewCrate {
        NewCrate {
            label: label.into(),
            owner,
        }
    }

    async fn repository() -> Repository<Crate> {
        Repository::bind(Arc::new(InMemoryDocumentStore::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_identity_sequence_and_timestamps() {
        let repo = repository().await;
        let first = repo.create(&draft("a", 1)).await.unwrap();
        let second = repo.create(&draft("b", 1)).await.unwrap();

        assert_eq!(first.crate_no, 1);
        assert_eq!(second.crate_no, 2);
        assert_eq!(first.created_at, first.updated_at);
        assert_ne!(first.id, second.id);
        assert_eq!(repo.get_by_id(&first.id.to_string()).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn conflicting_insert_consumes_a_sequence_value() {
        let repo = repository().await;
        repo.create(&draft("a", 1)).await.unwrap();

        let err = repo.create(&draft("a", 2)).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::Conflict {
                collection: "crate".into(),
                field: "label".into()
            }
        );

        let next = repo.create(&draft("b", 1)).await.unwrap();
        assert_eq!(next.crate_no, 3);
    }

    #[tokio::test]
    async fn malformed_id_is_invalid_identifier() {
        let repo = repository().await;
        match repo.get_by_id("12").await {
            Err(RepositoryError::InvalidIdentifier(_)) => {}
            other => panic!("expected InvalidIdentifier, got {other:?}"),
        }
        let missing = DocumentId::new().to_string();
        assert_eq!(repo.get_by_id(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_all_paginates() {
        let repo = repository().await;
        for n in 0..5 {
            repo.create(&draft(&format!("c{n}"), n % 2)).await.unwrap();
        }

        let page = repo
            .get_all(&Filter::All, PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].label, "c2");
        assert_eq!(page.pagination.total_count, 5);
        assert_eq!(page.pagination.total_pages, 3);

        let owned = repo
            .get_all(&Filter::eq("owner", 0), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(owned.pagination.total_count, 3);
    }

    #[tokio::test]
    async fn update_never_touches_identity_fields() {
        let repo = repository().await;
        let created = repo.create(&draft("a", 1)).await.unwrap();

        let patch = serde_json::json!({
            "label": "renamed",
            "crate_no": 99,
            "_id": DocumentId::new().to_string(),
            "createdAt": "2000-01-01T00:00:00Z"
        });
        let outcome = repo.update(&Filter::eq("crate_no", 1), &patch).await.unwrap();

        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.affected_count, 1);
        let row = &outcome.updated_rows[0];
        assert_eq!(row.label, "renamed");
        assert_eq!(row.crate_no, 1);
        assert_eq!(row.id, created.id);
        assert_eq!(row.created_at, created.created_at);
        assert!(row.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_one_returning_and_missing_matches() {
        let repo = repository().await;
        repo.create(&draft("a", 1)).await.unwrap();

        let updated = repo
            .update_one_returning(&Filter::eq("crate_no", 1), &serde_json::json!({ "owner": 7 }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.owner, 7);

        let none = repo
            .update(&Filter::eq("crate_no", 42), &serde_json::json!({ "owner": 1 }))
            .await
            .unwrap();
        assert_eq!(none.matched_count, 0);
        assert!(none.updated_rows.is_empty());
    }

    #[tokio::test]
    async fn delete_is_reported_once() {
        let repo = repository().await;
        let created = repo.create(&draft("a", 1)).await.unwrap();

        let first = repo.delete(&Filter::eq("crate_no", 1)).await.unwrap();
        assert_eq!(first.deleted_count, 1);
        assert_eq!(first.deleted.map(|c| c.id), Some(created.id));

        let second = repo.delete(&Filter::eq("crate_no", 1)).await.unwrap();
        assert_eq!(second.deleted_count, 0);
        assert!(second.deleted.is_none());
    }

    #[tokio::test]
    async fn aggregation_counts_match_stages_only() {
        let repo = repository().await;
        let owners = repo.store().clone();
        owners
            .insert_one(
                "owner",
                serde_json::json!({ "owner_no": 1, "name": "Ada", "secret": "x" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        for n in 0..3 {
            repo.create(&draft(&format!("c{n}"), 1)).await.unwrap();
        }
        repo.create(&draft("orphan", 2)).await.unwrap();

        let join = JoinSpec::new("owner", "owner", "owner_no", "owner_doc")
            .project(Projection::include(["name"]))
            .single();
        let page: Page<Value> = repo
            .get_all_with_joins(&Filter::eq("owner", 1), &[join], PageRequest::new(None, Some(2)))
            .await
            .unwrap();

        assert_eq!(page.pagination.total_count, 3);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0]["owner_doc"], serde_json::json!({ "name": "Ada" }));
    }

    struct CountingHook(AtomicUsize);

    #[async_trait::async_trait]
    impl InsertHook for CountingHook {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn before_insert(&self, _collection: &str, _document: &mut Document) -> RepositoryResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RejectingHook;

    #[async_trait::async_trait]
    impl InsertHook for RejectingHook {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        async fn before_insert(&self, _collection: &str, _document: &mut Document) -> RepositoryResult<()> {
            Err(RepositoryError::Hook {
                hook: "rejecting",
                reason: "no".into(),
            })
        }
    }

    #[tokio::test]
    async fn hooks_run_per_document_and_failures_abort_without_burning_sequence() {
        let counter = Arc::new(CountingHook(AtomicUsize::new(0)));
        let repo = repository().await.with_hook(counter.clone());
        repo.create_many(&[draft("a", 1), draft("b", 1)]).await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        let rejecting = repository().await.with_hook(RejectingHook);
        let err = rejecting.create(&draft("a", 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Hook { hook: "rejecting", .. }));
        assert_eq!(rejecting.count(&Filter::All).await.unwrap(), 0);

        let sequences = SequenceGenerator::new(rejecting.store().clone());
        assert_eq!(sequences.current_value("crateNo").await.unwrap(), 0);
    }

    /// Fails for documents whose label is `poison`.
    struct PoisonHook;

    #[async_trait::async_trait]
    impl InsertHook for PoisonHook {
        fn name(&self) -> &'static str {
            "poison"
        }

        async fn before_insert(&self, _collection: &str, document: &mut Document) -> RepositoryResult<()> {
            if document.get("label") == Some(&Value::from("poison")) {
                return Err(RepositoryError::Hook {
                    hook: "poison",
                    reason: "poisoned label".into(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn batch_hook_failure_writes_nothing_but_keeps_earlier_allocations() {
        let repo = repository().await.with_hook(PoisonHook);
        let err = repo
            .create_many(&[draft("a", 1), draft("b", 1), draft("poison", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Hook { hook: "poison", .. }));
        assert_eq!(repo.count(&Filter::All).await.unwrap(), 0);

        let sequences = SequenceGenerator::new(repo.store().clone());
        assert_eq!(sequences.current_value("crateNo").await.unwrap(), 2);
        let next = repo.create(&draft("c", 1)).await.unwrap();
        assert_eq!(next.crate_no, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_get_contiguous_distinct_numbers() {
        let repo = Arc::new(repository().await);
        let tasks: Vec<_> = (0..50)
            .map(|n| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create(&draft(&format!("c{n}"), 1)).await })
            })
            .collect();

        let mut numbers = Vec::new();
        for task in tasks {
            numbers.push(task.await.unwrap().unwrap().crate_no);
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=50).collect::<Vec<i64>>());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn consecutive_pages_are_disjoint_and_ordered() {
        let repo = repository().await;
        for n in 0..25 {
            repo.create(&draft(&format!("c{n:02}"), 1)).await.unwrap();
        }

        let first = repo
            .get_all(&Filter::All, PageRequest::new(Some(1), Some(10)))
            .await
            .unwrap();
        let second = repo
            .get_all(&Filter::All, PageRequest::new(Some(2), Some(10)))
            .await
            .unwrap();
        assert_eq!(first.data.len(), 10);
        assert_eq!(second.data.len(), 10);

        let numbers: Vec<i64> = first
            .data
            .iter()
            .chain(&second.data)
            .map(|c| c.crate_no)
            .collect();
        assert_eq!(numbers, (1..=20).collect::<Vec<i64>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_duplicates_leave_one_winner() {
        let repo = Arc::new(repository().await);
        let tasks: Vec<_> = (0..10)
            .map(|owner| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create(&draft("same", owner)).await })
            })
            .collect();

        let mut created = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(RepositoryError::Conflict { field, .. }) => {
                    assert_eq!(field, "label");
                    conflicts += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!((created, conflicts), (1, 9));
        assert_eq!(repo.count(&Filter::eq("label", "same")).await.unwrap(), 1);
    }
}
