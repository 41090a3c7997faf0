//! Record collections the pipelines write to and read from.
//!
//! The engine only needs a create operation (and a listing for exports).
//! Implementations:
//!
//! - [`InMemoryCollection`] - process-local store with primary-key uniqueness
//! - [`FnCollection`] - adapts an async closure into a collection
//! - [`remote::HttpCollection`] - JSON over HTTP to a remote service
//! - [`Collection`] - whichever of the above the configuration selects

pub mod remote;

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{CreateError, CreateResult};
use crate::models::{BatchMode, EntitySchema, Record};

pub use remote::HttpCollection;

/// A backing store that records can be created in.
///
/// Each `create` is awaited to completion by the import pipeline before the
/// next one starts; atomicity of a single create is the implementor's
/// contract.
pub trait RecordCollection: Send + Sync {
    /// Create one record and return it as stored.
    fn create(
        &self,
        payload: Record,
        mode: &BatchMode,
    ) -> impl Future<Output = CreateResult<Record>> + Send;

    /// All records currently in the collection.
    fn list(&self) -> impl Future<Output = CreateResult<Vec<Record>>> + Send;
}

// =============================================================================
// In-memory collection
// =============================================================================

/// Process-local collection keyed by a unique field.
#[derive(Debug)]
pub struct InMemoryCollection {
    key_field: String,
    records: RwLock<Vec<Record>>,
}

impl InMemoryCollection {
    /// Empty collection whose `key_field` values must be unique.
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl RecordCollection for InMemoryCollection {
    async fn create(&self, payload: Record, _mode: &BatchMode) -> CreateResult<Record> {
        let key = match payload.get(&self.key_field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                return Err(CreateError::Validation(format!(
                    "'{}' is required",
                    self.key_field
                )))
            }
        };

        let mut records = self.records.write().await;
        let exists = records
            .iter()
            .any(|r| r.get(&self.key_field).and_then(Value::as_str) == Some(key.as_str()));
        if exists {
            return Err(CreateError::Conflict(format!(
                "{} '{}' already exists",
                self.key_field, key
            )));
        }

        records.push(payload.clone());
        Ok(payload)
    }

    async fn list(&self) -> CreateResult<Vec<Record>> {
        Ok(self.records.read().await.clone())
    }
}

// =============================================================================
// Configured collection
// =============================================================================

/// The collection a server or CLI run writes to, picked from configuration.
#[derive(Clone)]
pub enum Collection {
    Memory(Arc<InMemoryCollection>),
    Remote(HttpCollection),
}

impl Collection {
    /// Remote when a base URL is configured, in-memory otherwise.
    pub fn for_schema(config: &Config, schema: &EntitySchema) -> Self {
        match HttpCollection::from_config(config, schema) {
            Some(remote) => Collection::Remote(remote),
            None => Collection::Memory(Arc::new(InMemoryCollection::new(schema.primary))),
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Collection::Memory(_) => "in-memory".to_string(),
            Collection::Remote(remote) => remote.endpoint().to_string(),
        }
    }
}

impl RecordCollection for Collection {
    async fn create(&self, payload: Record, mode: &BatchMode) -> CreateResult<Record> {
        match self {
            Collection::Memory(c) => c.create(payload, mode).await,
            Collection::Remote(c) => c.create(payload, mode).await,
        }
    }

    async fn list(&self) -> CreateResult<Vec<Record>> {
        match self {
            Collection::Memory(c) => c.list().await,
            Collection::Remote(c) => c.list().await,
        }
    }
}

// =============================================================================
// Closure adapter
// =============================================================================

/// Wraps `Fn(Record) -> Future<Output = CreateResult<Record>>` as a
/// collection. Listing always yields nothing.
pub struct FnCollection<F> {
    create: F,
}

impl<F> FnCollection<F> {
    pub fn new(create: F) -> Self {
        Self { create }
    }
}

impl<F, Fut> RecordCollection for FnCollection<F>
where
    F: Fn(Record) -> Fut + Send + Sync,
    Fut: Future<Output = CreateResult<Record>> + Send,
{
    fn create(
        &self,
        payload: Record,
        _mode: &BatchMode,
    ) -> impl Future<Output = CreateResult<Record>> + Send {
        (self.create)(payload)
    }

    async fn list(&self) -> CreateResult<Vec<Record>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_create_and_list() {
        let c = InMemoryCollection::new("name");
        c.create(rec(json!({"name": "Ada"})), &BatchMode::Direct).await.unwrap();
        c.create(rec(json!({"name": "Bob"})), &BatchMode::Direct).await.unwrap();
        let all = c.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["name"], "Ada");
    }

    #[tokio::test]
    async fn test_in_memory_conflict() {
        let c = InMemoryCollection::new("name");
        c.create(rec(json!({"name": "Ada"})), &BatchMode::Direct).await.unwrap();
        let err = c
            .create(rec(json!({"name": "Ada"})), &BatchMode::Group("g".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::Conflict(_)));
        assert_eq!(c.len().await, 1);
    }

    #[tokio::test]
    async fn test_in_memory_requires_key() {
        let c = InMemoryCollection::new("name");
        let err = c.create(rec(json!({"email": "x"})), &BatchMode::Direct).await.unwrap_err();
        assert!(matches!(err, CreateError::Validation(_)));
        assert!(c.is_empty().await);
    }

    #[tokio::test]
    async fn test_fn_collection() {
        let c = FnCollection::new(|payload: Record| async move {
            if payload.contains_key("fail") {
                Err(CreateError::Transport("down".into()))
            } else {
                Ok(payload)
            }
        });
        assert!(c.create(rec(json!({"a": 1})), &BatchMode::Direct).await.is_ok());
        assert!(c.create(rec(json!({"fail": 1})), &BatchMode::Direct).await.is_err());
        assert!(c.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_configured_collection() {
        let memory = Collection::for_schema(&Config::default(), &crate::models::SUPPLIER);
        assert_eq!(memory.describe(), "in-memory");
        memory.create(rec(json!({"name": "Ada"})), &BatchMode::Direct).await.unwrap();
        assert_eq!(memory.list().await.unwrap().len(), 1);

        let config = Config {
            remote_url: Some("http://localhost:4004/odata".into()),
            ..Config::default()
        };
        let remote = Collection::for_schema(&config, &crate::models::PRODUCT);
        assert_eq!(remote.describe(), "http://localhost:4004/odata/products");
    }
}
