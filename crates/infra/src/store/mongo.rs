//! MongoDB-backed document store.
//!
//! Documents travel as JSON objects above this layer and as BSON below it;
//! conversion goes through serde on both sides (`bson::to_document` /
//! `bson::from_document`), so `_id` stays the UUID string assigned here and
//! timestamps stay RFC 3339 strings.
//!
//! ## Error Mapping
//!
//! | MongoDB error | Code | StoreError |
//! |---------------|------|------------|
//! | Write error (duplicate key) | `11000` | `DuplicateKey` |
//! | Bulk write error (duplicate key) | `11000` | `DuplicateKey` |
//! | Command error (duplicate key, find-and-modify) | `11000` | `DuplicateKey` |
//! | BSON (de)serialization | N/A | `Malformed` |
//! | Anything else | Any | `Backend` |
//!
//! ## Thread Safety
//!
//! `mongodb::Database` wraps a pooled client and is cheap to clone; the
//! store is `Send + Sync` and shared across request handlers.

use bson::{Bson, Document as BsonDocument, doc};
use futures_util::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{
    FindOneAndUpdateOptions, FindOptions as MongoFindOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, Database, IndexModel};
use serde_json::Value;
use tracing::instrument;

use crewdesk_core::DocumentId;

use super::{
    Document, DocumentStore, Filter, FindOptions, ID_FIELD, Lookup, Projection, Stage,
    StoreError, StoreResult, UpdateCounts,
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    db: Database,
}

impl MongoDocumentStore {
    /// Connect to `uri` and use `database`.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect: {e}")))?;
        Ok(Self::new(client.database(database)))
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.db.collection::<BsonDocument>(name)
    }
}

fn to_bson_document(document: &Document) -> StoreResult<BsonDocument> {
    bson::to_document(document).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn from_bson_document(document: BsonDocument) -> StoreResult<Document> {
    bson::from_document(document).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn to_bson_value(value: &Value) -> StoreResult<Bson> {
    bson::to_bson(value).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn filter_to_bson(filter: &Filter) -> StoreResult<BsonDocument> {
    let mut out = BsonDocument::new();
    match filter {
        Filter::All => {}
        Filter::Eq(field, value) => {
            out.insert(field.clone(), to_bson_value(value)?);
        }
        Filter::In(field, values) => {
            let values = values.iter().map(to_bson_value).collect::<StoreResult<Vec<_>>>()?;
            out.insert(field.clone(), doc! { "$in": values });
        }
        Filter::And(filters) if filters.is_empty() => {}
        Filter::And(filters) => {
            let parts = filters.iter().map(filter_to_bson).collect::<StoreResult<Vec<_>>>()?;
            out.insert("$and", parts);
        }
        // `$or` rejects an empty array; an empty `$in` matches nothing.
        Filter::Or(filters) if filters.is_empty() => {
            out.insert(ID_FIELD, doc! { "$in": [] });
        }
        Filter::Or(filters) => {
            let parts = filters.iter().map(filter_to_bson).collect::<StoreResult<Vec<_>>>()?;
            out.insert("$or", parts);
        }
    }
    Ok(out)
}

fn projection_to_bson(projection: &Projection) -> BsonDocument {
    let mut out = BsonDocument::new();
    match projection {
        Projection::Include(fields) => {
            if !fields.iter().any(|f| f == ID_FIELD) {
                out.insert(ID_FIELD, 0);
            }
            for field in fields {
                out.insert(field.clone(), 1);
            }
        }
        Projection::Exclude(fields) => {
            for field in fields {
                out.insert(field.clone(), 0);
            }
        }
    }
    out
}

fn lookup_to_bson(lookup: &Lookup) -> BsonDocument {
    let mut spec = doc! {
        "from": lookup.from.clone(),
        "localField": lookup.local_field.clone(),
        "foreignField": lookup.foreign_field.clone(),
        "as": lookup.as_field.clone(),
    };
    if let Some(projection) = &lookup.projection {
        spec.insert("pipeline", vec![doc! { "$project": projection_to_bson(projection) }]);
    }
    doc! { "$lookup": spec }
}

fn stage_to_bson(stage: &Stage) -> StoreResult<BsonDocument> {
    let mut out = BsonDocument::new();
    match stage {
        Stage::Match(filter) => {
            out.insert("$match", filter_to_bson(filter)?);
        }
        Stage::Lookup(lookup) => return Ok(lookup_to_bson(lookup)),
        Stage::Unwind {
            path,
            preserve_empty,
        } => {
            let mut spec = BsonDocument::new();
            spec.insert("path", format!("${path}"));
            spec.insert("preserveNullAndEmptyArrays", *preserve_empty);
            out.insert("$unwind", spec);
        }
        Stage::Project(projection) => {
            out.insert("$project", projection_to_bson(projection));
        }
        Stage::Skip(n) => {
            out.insert("$skip", clamp_i64(*n));
        }
        Stage::Limit(n) => {
            out.insert("$limit", clamp_i64(*n));
        }
    }
    Ok(out)
}

/// BSON integers are signed; larger counts saturate.
fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
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

/// Message of the first duplicate-key failure carried by `err`, if any.
fn duplicate_key_message(err: &MongoError) -> Option<String> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(e.message.clone())
        }
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()?
            .iter()
            .find(|e| e.code == DUPLICATE_KEY)
            .map(|e| e.message.clone()),
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY => Some(e.message.clone()),
        _ => None,
    }
}

/// Extract the field from `... index: cus_email_1 dup key: { ... }`.
fn duplicate_key_field(message: &str) -> Option<String> {
    let index = message.split("index: ").nth(1)?.split_whitespace().next()?;
    let field = index.strip_suffix("_1").unwrap_or(index);
    Some(field.to_string())
}

fn map_mongo_error(collection: &str, err: MongoError) -> StoreError {
    match duplicate_key_message(&err) {
        Some(message) => StoreError::DuplicateKey {
            collection: collection.to_string(),
            field: duplicate_key_field(&message).unwrap_or_else(|| "unknown".to_string()),
        },
        None => StoreError::Backend(err.to_string()),
    }
}

#[async_trait::async_trait]
impl DocumentStore for MongoDocumentStore {
    #[instrument(skip(self))]
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut keys = BsonDocument::new();
        keys.insert(field, 1);
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection(collection)
            .create_index(model, None)
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        Ok(())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let document = with_identity(document);
        self.collection(collection)
            .insert_one(to_bson_document(&document)?, None)
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        Ok(document)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<Document>> {
        if documents.is_empty() {
            return Ok(documents);
        }
        let documents: Vec<Document> = documents.into_iter().map(with_identity).collect();
        let encoded = documents
            .iter()
            .map(to_bson_document)
            .collect::<StoreResult<Vec<_>>>()?;
        self.collection(collection)
            .insert_many(encoded, None)
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        Ok(documents)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        self.collection(collection)
            .find_one(filter_to_bson(filter)?, None)
            .await
            .map_err(|e| map_mongo_error(collection, e))?
            .map(from_bson_document)
            .transpose()
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let find_options = MongoFindOptions::builder()
            .skip(options.skip)
            .limit(options.limit.map(clamp_i64))
            .build();
        let cursor = self
            .collection(collection)
            .find(filter_to_bson(filter)?, find_options)
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        let documents: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        documents.into_iter().map(from_bson_document).collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.collection(collection)
            .count_documents(filter_to_bson(filter)?, None)
            .await
            .map_err(|e| map_mongo_error(collection, e))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> StoreResult<UpdateCounts> {
        let result = self
            .collection(collection)
            .update_many(
                filter_to_bson(filter)?,
                doc! { "$set": to_bson_document(&set)? },
                None,
            )
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        Ok(UpdateCounts {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> StoreResult<Option<Document>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.collection(collection)
            .find_one_and_update(
                filter_to_bson(filter)?,
                doc! { "$set": to_bson_document(&set)? },
                options,
            )
            .await
            .map_err(|e| map_mongo_error(collection, e))?
            .map(from_bson_document)
            .transpose()
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        self.collection(collection)
            .find_one_and_delete(filter_to_bson(filter)?, None)
            .await
            .map_err(|e| map_mongo_error(collection, e))?
            .map(from_bson_document)
            .transpose()
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .delete_many(filter_to_bson(filter)?, None)
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        Ok(result.deleted_count)
    }

    #[instrument(skip(self))]
    async fn increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        by: i64,
    ) -> StoreResult<i64> {
        let mut key_filter = BsonDocument::new();
        key_filter.insert(ID_FIELD, key);
        let mut inc = BsonDocument::new();
        inc.insert(field, by);
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = self
            .collection(collection)
            .find_one_and_update(key_filter, doc! { "$inc": inc }, options)
            .await
            .map_err(|e| map_mongo_error(collection, e))?
            .ok_or_else(|| StoreError::Backend(format!("upsert of counter `{key}` returned nothing")))?;

        match counter.get(field) {
            Some(Bson::Int64(v)) => Ok(*v),
            Some(Bson::Int32(v)) => Ok(i64::from(*v)),
            Some(Bson::Double(v)) => Ok(*v as i64),
            _ => Err(StoreError::Malformed(format!(
                "counter `{key}` field `{field}` is not an integer"
            ))),
        }
    }

    async fn aggregate(&self, collection: &str, stages: &[Stage]) -> StoreResult<Vec<Document>> {
        let pipeline = stages.iter().map(stage_to_bson).collect::<StoreResult<Vec<_>>>()?;
        let cursor = self
            .collection(collection)
            .aggregate(pipeline, None)
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        let documents: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| map_mongo_error(collection, e))?;
        documents.into_iter().map(from_bson_document).collect()
    }
}
