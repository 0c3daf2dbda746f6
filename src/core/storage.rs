//! Storage engine collaborator.
//!
//! The gateway owns no persistence: every persisted-data operation is
//! delegated to a [`StorageEngine`] implementation injected at
//! construction time. Failures are propagated unchanged: the dispatch
//! core does not retry and does not mask.
//!
//! [`InMemoryStorage`] is the reference implementation: a process-local
//! engine backed by concurrent maps, used by the server binary and the
//! test suites. Query and index internals of a production engine are out
//! of scope here.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::request::Request;

/// Errors reported by a storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The request targets no index
    #[error("missing index")]
    MissingIndex,

    /// The request targets no collection
    #[error("missing collection")]
    MissingCollection,

    /// Document lookup without an id, or with a non-string id
    #[error("missing document id")]
    MissingDocumentId,

    /// The requested document does not exist
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The query could not be interpreted
    #[error("malformed query: {0}")]
    BadQuery(String),

    /// Backend fault
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Persisted-collection query interface consumed by the dispatch core.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Run a filtered search over one collection.
    async fn search(&self, request: &Request) -> Result<Value, StorageError>;

    /// Fetch one document by id.
    async fn get(&self, request: &Request) -> Result<Value, StorageError>;

    /// Count the documents matching a filter.
    async fn count(&self, request: &Request) -> Result<Value, StorageError>;

    /// Persist a new document.
    async fn create(&self, request: &Request) -> Result<Value, StorageError>;

    /// Names of the stored collections under `index`.
    async fn list_collections(&self, index: &str) -> Result<BTreeSet<String>, StorageError>;

    /// Names of all known indexes.
    async fn list_indexes(&self) -> Result<BTreeSet<String>, StorageError>;

    /// Whether the request's target collection exists.
    async fn collection_exists(&self, request: &Request) -> Result<bool, StorageError>;

    /// Whether the request's target index exists.
    async fn index_exists(&self, request: &Request) -> Result<bool, StorageError>;

    /// Live status descriptor for operational endpoints.
    async fn get_infos(&self) -> Result<Value, StorageError>;
}

type DocumentMap = DashMap<String, Value>;

/// Process-local storage engine backed by concurrent maps.
///
/// Documents live under `index -> collection -> id`. Filtering supports
/// match-all and exact equality on top-level fields, which is all the
/// gateway's own tests and demos need.
#[derive(Default)]
pub struct InMemoryStorage {
    indexes: DashMap<String, DashMap<String, DocumentMap>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn target<'a>(request: &'a Request) -> Result<(&'a str, &'a str), StorageError> {
        let index = request.index().ok_or(StorageError::MissingIndex)?;
        let collection = request
            .collection()
            .ok_or(StorageError::MissingCollection)?;
        Ok((index, collection))
    }

    /// Documents of `index/collection` matching the request's query.
    fn matching(&self, request: &Request) -> Result<Vec<(String, Value)>, StorageError> {
        let (index, collection) = Self::target(request)?;
        let query = match request.content().get("query") {
            None | Some(Value::Null) => None,
            Some(Value::Object(filter)) => Some(filter.clone()),
            Some(other) => {
                return Err(StorageError::BadQuery(format!(
                    "query must be an object, got {other}"
                )));
            }
        };

        let Some(collections) = self.indexes.get(index) else {
            return Ok(Vec::new());
        };
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let hits = documents
            .iter()
            .filter(|entry| match &query {
                None => true,
                Some(filter) => filter
                    .iter()
                    .all(|(field, expected)| entry.value().get(field) == Some(expected)),
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        Ok(hits)
    }
}

#[async_trait]
impl StorageEngine for InMemoryStorage {
    async fn search(&self, request: &Request) -> Result<Value, StorageError> {
        let mut hits = self.matching(request)?;
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        let total = hits.len();
        let hits: Vec<Value> = hits
            .into_iter()
            .map(|(id, source)| json!({"_id": id, "_source": source}))
            .collect();
        Ok(json!({"total": total, "hits": hits}))
    }

    async fn get(&self, request: &Request) -> Result<Value, StorageError> {
        let (index, collection) = Self::target(request)?;
        let id = request
            .content()
            .get("_id")
            .and_then(Value::as_str)
            .ok_or(StorageError::MissingDocumentId)?;

        self.indexes
            .get(index)
            .and_then(|collections| {
                collections
                    .get(collection)
                    .and_then(|documents| documents.get(id).map(|doc| doc.value().clone()))
            })
            .map(|source| json!({"_id": id, "_source": source}))
            .ok_or_else(|| StorageError::DocumentNotFound(id.to_string()))
    }

    async fn count(&self, request: &Request) -> Result<Value, StorageError> {
        let hits = self.matching(request)?;
        Ok(json!({"count": hits.len()}))
    }

    async fn create(&self, request: &Request) -> Result<Value, StorageError> {
        let (index, collection) = Self::target(request)?;
        let source = request.content().clone();
        let id = source
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.indexes
            .entry(index.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), source.clone());

        Ok(json!({"_id": id, "created": true, "_source": source}))
    }

    async fn list_collections(&self, index: &str) -> Result<BTreeSet<String>, StorageError> {
        Ok(self
            .indexes
            .get(index)
            .map(|collections| collections.iter().map(|c| c.key().clone()).collect())
            .unwrap_or_default())
    }

    async fn list_indexes(&self) -> Result<BTreeSet<String>, StorageError> {
        Ok(self.indexes.iter().map(|i| i.key().clone()).collect())
    }

    async fn collection_exists(&self, request: &Request) -> Result<bool, StorageError> {
        let (index, collection) = Self::target(request)?;
        Ok(self
            .indexes
            .get(index)
            .is_some_and(|collections| collections.contains_key(collection)))
    }

    async fn index_exists(&self, request: &Request) -> Result<bool, StorageError> {
        let index = request.index().ok_or(StorageError::MissingIndex)?;
        Ok(self.indexes.contains_key(index))
    }

    async fn get_infos(&self) -> Result<Value, StorageError> {
        let documents: usize = self
            .indexes
            .iter()
            .flat_map(|index| {
                index
                    .value()
                    .iter()
                    .map(|collection| collection.value().len())
                    .collect::<Vec<_>>()
            })
            .sum();
        Ok(json!({
            "type": "memory",
            "indexes": self.indexes.len(),
            "documents": documents,
        }))
    }
}
