//! Aggregation pipeline stages and their in-memory evaluation.
//!
//! Stages mirror the MongoDB operators of the same name; [`run`] evaluates
//! them over plain documents for the in-memory backend.

use serde_json::Value;

use super::{Document, Filter, get_path};

/// Field projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Keep only these top-level fields (`_id` only if listed).
    Include(Vec<String>),
    /// Drop these top-level fields.
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::Include(fields.into_iter().map(Into::into).collect())
    }

    pub fn exclude<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::Exclude(fields.into_iter().map(Into::into).collect())
    }

    pub fn apply(&self, document: Document) -> Document {
        match self {
            Projection::Include(fields) => document
                .into_iter()
                .filter(|(k, _)| fields.iter().any(|f| f == k))
                .collect(),
            Projection::Exclude(fields) => document
                .into_iter()
                .filter(|(k, _)| !fields.iter().any(|f| f == k))
                .collect(),
        }
    }
}

/// Left outer join against another collection (`$lookup`).
///
/// Every input document gains `as_field`: an array of the foreign documents
/// whose `foreign_field` equals the input's `local_field` (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
    /// Applied to each joined foreign document.
    pub projection: Option<Projection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Lookup(Lookup),
    /// Flatten an array field into one document per element. With
    /// `preserve_empty`, documents whose array is empty or missing are kept
    /// (the empty field is dropped) instead of discarded.
    Unwind { path: String, preserve_empty: bool },
    Project(Projection),
    Skip(u64),
    Limit(u64),
}

/// Evaluate `stages` over `documents`. `foreign` resolves a collection name
/// to its documents for lookups.
pub(crate) fn run<'a, F>(mut documents: Vec<Document>, stages: &[Stage], foreign: F) -> Vec<Document>
where
    F: Fn(&str) -> &'a [Document],
{
    for stage in stages {
        documents = match stage {
            Stage::Match(filter) => documents.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Lookup(lookup) => {
                let others = foreign(&lookup.from);
                documents
                    .into_iter()
                    .map(|d| join(d, lookup, others))
                    .collect()
            }
            Stage::Unwind {
                path,
                preserve_empty,
            } => documents
                .into_iter()
                .flat_map(|d| unwind(d, path, *preserve_empty))
                .collect(),
            Stage::Project(projection) => {
                documents.into_iter().map(|d| projection.apply(d)).collect()
            }
            Stage::Skip(n) => documents.into_iter().skip(*n as usize).collect(),
            Stage::Limit(n) => documents.into_iter().take(*n as usize).collect(),
        };
    }
    documents
}

fn join(mut document: Document, lookup: &Lookup, others: &[Document]) -> Document {
    let joined: Vec<Value> = match get_path(&document, &lookup.local_field) {
        None | Some(Value::Null) => Vec::new(),
        Some(local) => {
            let keys: Vec<&Value> = match local {
                Value::Array(items) => items.iter().collect(),
                single => vec![single],
            };
            others
                .iter()
                .filter(|f| {
                    get_path(f, &lookup.foreign_field).is_some_and(|v| keys.contains(&v))
                })
                .map(|f| {
                    let f = match &lookup.projection {
                        Some(p) => p.apply(f.clone()),
                        None => f.clone(),
                    };
                    Value::Object(f)
                })
                .collect()
        }
    };
    document.insert(lookup.as_field.clone(), Value::Array(joined));
    document
}

fn unwind(mut document: Document, path: &str, preserve_empty: bool) -> Vec<Document> {
    match document.remove(path) {
        Some(Value::Array(items)) if !items.is_empty() => items
            .into_iter()
            .map(|item| {
                let mut d = document.clone();
                d.insert(path.to_string(), item);
                d
            })
            .collect(),
        Some(Value::Array(_)) | None | Some(Value::Null) => {
            if preserve_empty {
                vec![document]
            } else {
                Vec::new()
            }
        }
        Some(value) => {
            document.insert(path.to_string(), value);
            vec![document]
        }
    }
}
